//! 串口 / 标准输入的文本命令

use crate::app::workflow::EditEvent;

/// 一条命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit(EditEvent),
    /// 打开传感器菜单
    Menu,
    Quit,
}

/// 解析一行命令，无法识别时返回 `None`
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if let Some(name) = line.strip_prefix("name ") {
        return Some(Command::Edit(EditEvent::NameSubmitted(name.trim().to_string())));
    }
    let command = match line.to_ascii_lowercase().as_str() {
        "u" | "up" => Command::Edit(EditEvent::Up),
        "d" | "down" => Command::Edit(EditEvent::Down),
        "l" | "left" => Command::Edit(EditEvent::Left),
        "r" | "right" => Command::Edit(EditEvent::Right),
        "ok" | "enter" => Command::Edit(EditEvent::Ok),
        "b" | "back" => Command::Edit(EditEvent::Back),
        "menu" | "m" => Command::Menu,
        "q" | "quit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_keys() {
        assert_eq!(parse_command("up"), Some(Command::Edit(EditEvent::Up)));
        assert_eq!(parse_command(" D \n"), Some(Command::Edit(EditEvent::Down)));
        assert_eq!(parse_command("ok"), Some(Command::Edit(EditEvent::Ok)));
        assert_eq!(parse_command("menu"), Some(Command::Menu));
        assert_eq!(parse_command("q"), Some(Command::Quit));
    }

    #[test]
    fn name_keeps_its_text() {
        assert_eq!(
            parse_command("name Attic"),
            Some(Command::Edit(EditEvent::NameSubmitted("Attic".into())))
        );
    }

    #[test]
    fn unknown_commands_are_ignored() {
        assert_eq!(parse_command("jump"), None);
        assert_eq!(parse_command(""), None);
    }
}
