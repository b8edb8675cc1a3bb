use colored::*;
use indicatif::ProgressBar;
use std::time::Duration;

use crate::{
    disk::BlockDevice,
    fs::{
        error::{FsError, Result},
        ops::FileKind,
        FileSystem,
    },
};

#[derive(Debug)]
pub enum Command {
    Help,
    Ls(Option<String>),
    Pwd,
    Mkdir(String),
    Rmdir(String),
    Create(String),
    Rm(String),
    Cd(String),
    Read(String, Option<u64>, Option<u64>),
    Write(String, String),
    Append(String, String),
    Truncate(String, u64),
    Stat(String),
    Df,
    Format,
    Exit,
}

/// 把 shell 参数换成绝对路径。当前目录只可能是 `/` 或 `/dir`
pub fn resolve_path(current_dir: &str, arg: &str) -> String {
    match arg {
        "." => current_dir.to_string(),
        ".." => "/".to_string(),
        _ if arg.starts_with('/') => arg.to_string(),
        _ if current_dir == "/" => format!("/{}", arg),
        _ => format!("{}/{}", current_dir, arg),
    }
}

pub fn execute_command<D: BlockDevice>(
    cmd: &Command,
    fs: &mut FileSystem<D>,
    current_dir: &mut String,
) -> Result<()> {
    let path = |arg: &str| resolve_path(current_dir.as_str(), arg);

    match cmd {
        Command::Help => print_help(),
        Command::Ls(target) => {
            let dir = target.as_deref().map_or_else(|| current_dir.clone(), path);
            let names = fs.list_directory(&dir)?;
            if names.is_empty() {
                println!("{}", "(empty)".bright_black());
            }
            for name in names {
                let full = resolve_path(&dir, &name);
                let attr = fs.stat(&full)?;
                match attr.kind {
                    FileKind::Directory => println!("📁  {}", name.blue().bold()),
                    FileKind::File => println!(
                        "📄  {:<12} {}",
                        name,
                        format!("{} bytes", attr.size).bright_black()
                    ),
                }
            }
        }
        Command::Pwd => println!("📍 {}", current_dir.cyan()),
        Command::Mkdir(name) => {
            let target = path(name);
            fs.create_directory(&target)?;
            println!("✅ Created directory: {}", target.green());
        }
        Command::Rmdir(name) => {
            let target = path(name);
            fs.remove_directory(&target)?;
            if *current_dir == target {
                *current_dir = "/".to_string();
            }
            println!("🗑️  Removed directory: {}", target.red());
        }
        Command::Create(name) => {
            let target = path(name);
            fs.create_file(&target)?;
            println!("📝 Created file: {}", target.green());
        }
        Command::Rm(name) => {
            let target = path(name);
            fs.remove_file(&target)?;
            println!("❌ Deleted file: {}", target.red());
        }
        Command::Cd(name) => {
            let target = path(name);
            let attr = fs.stat(&target)?;
            if attr.kind != FileKind::Directory {
                return Err(FsError::NotADirectory(target));
            }
            *current_dir = target.trim_end_matches('/').to_string();
            if current_dir.is_empty() {
                *current_dir = "/".to_string();
            }
            println!("📂 Moved to {}", current_dir.blue());
        }
        Command::Read(name, offset, len) => {
            let target = path(name);
            let bytes = fs.read(&target, offset.unwrap_or(0), len.unwrap_or(u64::MAX))?;
            println!("📖 {} ({} bytes)", target.cyan(), bytes.len());
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        Command::Write(name, content) => {
            let target = path(name);
            // 先覆盖再截短：空间不足时写入失败，原内容保持不变
            let written = fs.write(&target, 0, content.as_bytes())?;
            fs.truncate(&target, written as u64)?;
            println!("✏️  Wrote {} bytes to {}", written, target.cyan());
        }
        Command::Append(name, content) => {
            let target = path(name);
            let size = fs.stat(&target)?.size;
            let written = fs.write(&target, size, content.as_bytes())?;
            println!("✏️  Appended {} bytes to {}", written, target.cyan());
        }
        Command::Truncate(name, size) => {
            let target = path(name);
            fs.truncate(&target, *size)?;
            println!("✂️  {} is now {} bytes", target.cyan(), size);
        }
        Command::Stat(name) => {
            let target = path(name);
            let attr = fs.stat(&target)?;
            let kind = match attr.kind {
                FileKind::Directory => "Directory",
                FileKind::File => "File",
            };
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {} bytes\n{}: {}\n{}: {}\n",
                "📊 File Info".bright_yellow().bold(),
                "Path".blue(),
                target,
                "Type".blue(),
                kind,
                "Size".blue(),
                attr.size,
                "Mode".blue(),
                attr.mode.permission_string(),
                "Links".blue(),
                attr.nlink
            );
        }
        Command::Df => {
            let usage = fs.usage()?;
            let used = usage.total_blocks - usage.free_blocks;
            println!("{}", "💽 Disk Usage".bright_yellow().bold());
            println!(
                "{}: {} / {} used ({} free)",
                "Blocks".blue(),
                used,
                usage.total_blocks,
                usage.free_blocks
            );
            println!(
                "{}: {} / {}",
                "Directories".blue(),
                usage.directories,
                usage.max_directories
            );
            println!(
                "{}: {}",
                "Files per directory".blue(),
                usage.max_files_per_directory
            );
        }
        Command::Format => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_message("💾 Formatting virtual disk...");
            spinner.enable_steady_tick(Duration::from_millis(80));
            let result = fs.format();
            match &result {
                Ok(()) => spinner.finish_with_message("✅ Disk formatted successfully!"),
                Err(_) => spinner.finish_with_message("❌ Format failed"),
            }
            result?;
            *current_dir = "/".to_string();
        }
        Command::Exit => println!("{}", "👋 Exiting MiniFS shell...".yellow().bold()),
    }

    Ok(())
}

fn print_help() {
    println!("{}", "📘 MiniFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls [dir]                   List directories (at /) or files
  pwd                        Print current path
  cd <dir>                   Change directory (/ or /dir)
  mkdir <dir>                Create directory (max 8 chars, only under /)
  rmdir <dir>                Remove an empty directory
  create <file>              Create file (8.3 name, only inside a directory)
  rm <file>                  Remove file
  read <file> [off] [len]    Read file content
  write <file> <text>        Replace file content with text
  append <file> <text>       Append text to file
  truncate <file> <size>     Shrink or zero-extend file
  stat <path>                Show file info
  df                         Show disk usage
  format                     Format virtual disk
  help                       Show this help message
  exit                       Quit the shell
"
        .bright_black()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disk::mem_disk::MemDisk, shell::parse::parse_command};

    fn run(fs: &mut FileSystem<MemDisk>, cwd: &mut String, line: &str) -> Result<()> {
        let cmd = parse_command(line).expect("command should parse");
        execute_command(&cmd, fs, cwd)
    }

    #[test]
    fn relative_paths_resolve_against_current_dir() {
        assert_eq!(resolve_path("/", "docs"), "/docs");
        assert_eq!(resolve_path("/docs", "a.txt"), "/docs/a.txt");
        assert_eq!(resolve_path("/docs", "/other/b.txt"), "/other/b.txt");
        assert_eq!(resolve_path("/docs", ".."), "/");
        assert_eq!(resolve_path("/docs", "."), "/docs");
    }

    #[test]
    fn shell_session() {
        let mut fs = FileSystem::new(MemDisk::new(64));
        fs.format().unwrap();
        let mut cwd = "/".to_string();

        run(&mut fs, &mut cwd, "mkdir docs").unwrap();
        run(&mut fs, &mut cwd, "cd docs").unwrap();
        assert_eq!(cwd, "/docs");

        run(&mut fs, &mut cwd, "create a.txt").unwrap();
        run(&mut fs, &mut cwd, "write a.txt hello").unwrap();
        run(&mut fs, &mut cwd, "append a.txt world").unwrap();
        assert_eq!(fs.read("/docs/a.txt", 0, 100).unwrap(), b"helloworld");

        run(&mut fs, &mut cwd, "write a.txt bye").unwrap();
        assert_eq!(fs.read("/docs/a.txt", 0, 100).unwrap(), b"bye");

        run(&mut fs, &mut cwd, "truncate a.txt 1").unwrap();
        assert_eq!(fs.stat("/docs/a.txt").unwrap().size, 1);
        run(&mut fs, &mut cwd, "ls").unwrap();
        run(&mut fs, &mut cwd, "stat a.txt").unwrap();
        run(&mut fs, &mut cwd, "df").unwrap();

        assert!(matches!(
            run(&mut fs, &mut cwd, "cd a.txt"),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(
            run(&mut fs, &mut cwd, "rmdir /docs"),
            Err(FsError::DirectoryNotEmpty(_))
        ));
        run(&mut fs, &mut cwd, "rm a.txt").unwrap();
        run(&mut fs, &mut cwd, "rmdir /docs").unwrap();
        assert_eq!(cwd, "/");
        assert!(fs.list_directory("/").unwrap().is_empty());
    }

    #[test]
    fn write_that_does_not_fit_keeps_old_content() {
        // 0 号根目录、1 号子目录，只剩 2 个数据块
        let mut fs = FileSystem::new(MemDisk::new(4));
        fs.format().unwrap();
        let mut cwd = "/".to_string();
        run(&mut fs, &mut cwd, "mkdir d").unwrap();
        run(&mut fs, &mut cwd, "cd d").unwrap();
        run(&mut fs, &mut cwd, "create a.txt").unwrap();
        run(&mut fs, &mut cwd, "write a.txt hello").unwrap();

        let big = format!("write a.txt {}", "x".repeat(1600));
        assert!(matches!(run(&mut fs, &mut cwd, &big), Err(FsError::DiskFull)));
        assert_eq!(fs.read("/d/a.txt", 0, 100).unwrap(), b"hello");
    }

    #[test]
    fn format_resets_current_dir() {
        let mut fs = FileSystem::new(MemDisk::new(16));
        fs.format().unwrap();
        let mut cwd = "/".to_string();
        run(&mut fs, &mut cwd, "mkdir d").unwrap();
        run(&mut fs, &mut cwd, "cd d").unwrap();
        run(&mut fs, &mut cwd, "format").unwrap();
        assert_eq!(cwd, "/");
        assert!(fs.list_directory("/").unwrap().is_empty());
    }
}
