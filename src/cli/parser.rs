//! Command parser for the text front end.

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// "new [config.json]": fresh game, optionally under a variant config.
    New { config_path: Option<String> },
    /// "position startpos|fen <fen> [moves m1 m2 ...]"
    Position { fen: Option<String>, moves: Vec<String> },
    /// "move e2e4"
    Move(String),
    /// "undo"
    Undo,
    /// "legal": list legal moves.
    Legal,
    /// "go [depth N] [movetime MS] [nodes N] [infinite]"
    Go { depth: Option<i32>, movetime: Option<u64>, nodes: Option<u64>, infinite: bool },
    /// "perft N"
    Perft(u32),
    /// "eval"
    Eval,
    /// "d": display the board.
    Display,
    /// "fen"
    Fen,
    /// "save <path>" / "load <path>"
    Save(String),
    Load(String),
    Help,
    Quit,
    Unknown(String),
}

/// Parse one input line.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    let mut parts = input.split_whitespace();

    match parts.next() {
        Some("new") => Command::New { config_path: parts.next().map(str::to_string) },
        Some("position") => parse_position(&mut parts),
        Some("move") | Some("m") => match parts.next() {
            Some(m) => Command::Move(m.to_string()),
            None => Command::Unknown(input.to_string()),
        },
        Some("undo") => Command::Undo,
        Some("legal") => Command::Legal,
        Some("go") => parse_go(&mut parts),
        Some("perft") => match parts.next().and_then(|d| d.parse().ok()) {
            Some(depth) => Command::Perft(depth),
            None => Command::Unknown(input.to_string()),
        },
        Some("eval") => Command::Eval,
        Some("d") => Command::Display,
        Some("fen") => Command::Fen,
        Some("save") => match parts.next() {
            Some(path) => Command::Save(path.to_string()),
            None => Command::Unknown(input.to_string()),
        },
        Some("load") => match parts.next() {
            Some(path) => Command::Load(path.to_string()),
            None => Command::Unknown(input.to_string()),
        },
        Some("help") => Command::Help,
        Some("quit") | Some("exit") => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    }
}

fn parse_position<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Command {
    let mut fen = None;
    let mut moves = Vec::new();
    let mut parsing_moves = false;

    while let Some(token) = parts.next() {
        match token {
            "startpos" => fen = None,
            "fen" => {
                // A FEN is up to six whitespace-separated fields.
                let mut fields = Vec::new();
                for _ in 0..6 {
                    match parts.next() {
                        Some("moves") => {
                            parsing_moves = true;
                            break;
                        }
                        Some(field) => fields.push(field),
                        None => break,
                    }
                }
                if !fields.is_empty() {
                    fen = Some(fields.join(" "));
                }
            }
            "moves" => parsing_moves = true,
            _ if parsing_moves => moves.push(token.to_string()),
            _ => {}
        }
    }

    Command::Position { fen, moves }
}

fn parse_go<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Command {
    let mut depth = None;
    let mut movetime = None;
    let mut nodes = None;
    let mut infinite = false;

    let tokens: Vec<&str> = parts.collect();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "infinite" => infinite = true,
            "depth" => {
                i += 1;
                depth = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "movetime" => {
                i += 1;
                movetime = tokens.get(i).and_then(|t| t.parse().ok());
            }
            "nodes" => {
                i += 1;
                nodes = tokens.get(i).and_then(|t| t.parse().ok());
            }
            _ => {}
        }
        i += 1;
    }

    Command::Go { depth, movetime, nodes, infinite }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("undo"), Command::Undo);
        assert_eq!(parse_command("  quit  "), Command::Quit);
        assert_eq!(parse_command("move e2e4"), Command::Move("e2e4".to_string()));
        assert_eq!(parse_command("perft 4"), Command::Perft(4));
        assert!(matches!(parse_command("frobnicate"), Command::Unknown(_)));
    }

    #[test]
    fn test_go_parameters() {
        assert_eq!(
            parse_command("go depth 6 movetime 250"),
            Command::Go { depth: Some(6), movetime: Some(250), nodes: None, infinite: false }
        );
        assert_eq!(
            parse_command("go infinite"),
            Command::Go { depth: None, movetime: None, nodes: None, infinite: true }
        );
    }

    #[test]
    fn test_position_with_fen_and_moves() {
        let cmd = parse_command("position fen 4k3/8/8/8/8/8/8/4K3 w - - 0 1 moves e1e2");
        match cmd {
            Command::Position { fen, moves } => {
                assert_eq!(fen.as_deref(), Some("4k3/8/8/8/8/8/8/4K3 w - - 0 1"));
                assert_eq!(moves, vec!["e1e2"]);
            }
            other => panic!("parsed {:?}", other),
        }
    }

    #[test]
    fn test_position_startpos_moves() {
        let cmd = parse_command("position startpos moves e2e4 e7e5");
        match cmd {
            Command::Position { fen, moves } => {
                assert_eq!(fen, None);
                assert_eq!(moves, vec!["e2e4", "e7e5"]);
            }
            other => panic!("parsed {:?}", other),
        }
    }
}
