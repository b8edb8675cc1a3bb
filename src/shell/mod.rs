pub mod command;
pub mod parse;

use crate::{
    cli::Args,
    disk::{file_disk::FileDisk, init::perform_disk_initialization},
    fs::{
        error::{FsError, Result},
        FileSystem,
    },
    shell::{
        command::{execute_command, Command},
        parse::parse_command,
    },
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::{io::stdout, path::PathBuf, sync::mpsc, thread};

/// 后台初始化线程发给 shell 的启动进度
pub enum BootProgress {
    Step(&'static str),
    Progress(u64),
    Finished(Result<FileSystem<FileDisk>>),
}

pub fn start_shell(args: Args) -> Result<()> {
    let mut fs = boot(&args)?;

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
    let mut current_dir = String::from("/");

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minifs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => warn!("history disabled: {}", e),
    }

    // 命令补全
    let commands = vec![
        "help", "ls", "pwd", "mkdir", "rmdir", "create", "rm", "cd", "read", "write", "append",
        "truncate", "stat", "df", "format", "exit",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let completer = DefaultCompleter::new_with_wordlen(commands, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(format!("{}@{}:{}", username, hostname, current_dir)),
            DefaultPromptSegment::Basic("MiniFS".to_string()),
        );

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(Command::Exit) => {
                        println!("{}", "👋 Bye!".bright_yellow());
                        break;
                    }
                    Some(Command::Format) if !confirm_format() => {
                        println!("{}", "Format cancelled.".bright_black());
                    }
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut fs, &mut current_dir) {
                            report_error(&e);
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command or bad arguments. Type 'help' for command list."
                            .yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting MiniFS...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    fs.unmount()?;
    println!("{}", "GoodBye!".bright_yellow());
    Ok(())
}

fn report_error(e: &FsError) {
    println!(
        "{} {} {}",
        "❌ Error:".red().bold(),
        e,
        format!("(errno {})", e.errno()).bright_black()
    );
}

fn confirm_format() -> bool {
    Confirm::new()
        .with_prompt("This erases every directory and file on the disk. Continue?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// 后台线程打开并挂载镜像，前台用进度条显示进度
fn boot(args: &Args) -> Result<FileSystem<FileDisk>> {
    let mut stdout = stdout();
    // 清屏失败不影响使用
    let _ = execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0));
    println!("{}", "[MiniFS Booting...]".bright_yellow().bold());

    let (tx, rx) = mpsc::channel();
    let image = args.image.clone();
    let (blocks, force_format) = (args.blocks, args.format);
    let worker = thread::spawn(move || {
        perform_disk_initialization(&image, blocks, force_format, tx);
    });

    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut outcome = None;
    for event in rx {
        match event {
            BootProgress::Step(step) => pb.println(step),
            BootProgress::Progress(pct) => pb.set_position(pct),
            BootProgress::Finished(result) => {
                outcome = Some(result);
            }
        }
    }
    let _ = worker.join();

    let fs = match outcome {
        Some(Ok(fs)) => fs,
        Some(Err(e)) => {
            pb.abandon_with_message("❌ Boot failed");
            return Err(e);
        }
        None => {
            pb.abandon_with_message("❌ Boot failed");
            return Err(FsError::IoFault(std::io::Error::other(
                "disk initialization thread exited early",
            )));
        }
    };
    pb.finish_with_message("✅ Ready!");

    let _ = execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!(
            "Welcome to MiniFS v{} ({})\n",
            env!("CARGO_PKG_VERSION"),
            fs.device().path().display()
        )),
        ResetColor
    );
    Ok(fs)
}
