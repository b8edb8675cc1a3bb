use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.split_ascii_whitespace().collect();
    let (&cmd, args) = tokens.split_first()?;

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls(args.first().map(|s| s.to_string()))),
        "pwd" => Some(Command::Pwd),
        "mkdir" => args.first().map(|&name| Command::Mkdir(name.to_string())),
        "rmdir" => args.first().map(|&name| Command::Rmdir(name.to_string())),
        "create" | "touch" => args.first().map(|&name| Command::Create(name.to_string())),
        "rm" => args.first().map(|&name| Command::Rm(name.to_string())),
        "cd" => args.first().map(|&name| Command::Cd(name.to_string())),
        "read" | "cat" => {
            let file = args.first()?.to_string();
            let offset = match args.get(1) {
                Some(s) => Some(s.parse().ok()?),
                None => None,
            };
            let len = match args.get(2) {
                Some(s) => Some(s.parse().ok()?),
                None => None,
            };
            Some(Command::Read(file, offset, len))
        }
        "write" if args.len() >= 2 => Some(Command::Write(args[0].to_string(), args[1..].join(" "))),
        "append" if args.len() >= 2 => {
            Some(Command::Append(args[0].to_string(), args[1..].join(" ")))
        }
        "truncate" if args.len() == 2 => Some(Command::Truncate(
            args[0].to_string(),
            args[1].parse().ok()?,
        )),
        "stat" => args.first().map(|&name| Command::Stat(name.to_string())),
        "df" => Some(Command::Df),
        "format" => Some(Command::Format),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert!(matches!(parse_command("ls"), Some(Command::Ls(None))));
        assert!(matches!(
            parse_command("  mkdir   docs "),
            Some(Command::Mkdir(d)) if d == "docs"
        ));
        assert!(matches!(
            parse_command("write a.txt hello   there"),
            Some(Command::Write(f, t)) if f == "a.txt" && t == "hello there"
        ));
        assert!(matches!(
            parse_command("read a.txt 10 5"),
            Some(Command::Read(f, Some(10), Some(5))) if f == "a.txt"
        ));
        assert!(matches!(
            parse_command("truncate a.txt 0"),
            Some(Command::Truncate(f, 0)) if f == "a.txt"
        ));
    }

    #[test]
    fn rejects_incomplete_or_unknown_input() {
        assert!(parse_command("").is_none());
        assert!(parse_command("mkdir").is_none());
        assert!(parse_command("write a.txt").is_none());
        assert!(parse_command("truncate a.txt big").is_none());
        assert!(parse_command("read a.txt x").is_none());
        assert!(parse_command("frobnicate").is_none());
    }
}
