//! Command handler and main loop.

use std::fs;
use std::io::{self, BufRead, Write};

use super::parser::{parse_command, Command};
use super::{ENGINE_NAME, ENGINE_VERSION};
use crate::eval;
use crate::game::{Game, GameSave};
use crate::movegen;
use crate::search::SearchLimits;
use crate::types::Depth;
use crate::variant::VariantConfig;

/// Drives a [`Game`] from line-oriented commands.
pub struct CliHandler {
    game: Game,
    quit: bool,
}

impl CliHandler {
    pub fn new(config: VariantConfig) -> Result<Self, crate::variant::ConfigError> {
        Ok(CliHandler { game: Game::new(config)?, quit: false })
    }

    /// Blocking read-eval loop over stdin.
    pub fn run(&mut self) {
        self.send(&format!("{} {}", ENGINE_NAME, ENGINE_VERSION));
        self.send("type `help` for commands");
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(input) => {
                    self.handle_input(&input);
                    if self.quit {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    }

    /// Handle one input line. Public so tests and embedders can drive the
    /// handler without a terminal.
    pub fn handle_input(&mut self, input: &str) {
        if input.trim().is_empty() {
            return;
        }
        match parse_command(input) {
            Command::New { config_path } => self.cmd_new(config_path.as_deref()),
            Command::Position { fen, moves } => self.cmd_position(fen.as_deref(), &moves),
            Command::Move(text) => self.cmd_move(&text),
            Command::Undo => self.cmd_undo(),
            Command::Legal => self.cmd_legal(),
            Command::Go { depth, movetime, nodes, infinite } => {
                self.cmd_go(depth, movetime, nodes, infinite)
            }
            Command::Perft(depth) => self.cmd_perft(depth),
            Command::Eval => self.cmd_eval(),
            Command::Display => self.send(&self.game.board().to_string()),
            Command::Fen => self.send(&self.game.board().to_fen()),
            Command::Save(path) => self.cmd_save(&path),
            Command::Load(path) => self.cmd_load(&path),
            Command::Help => self.cmd_help(),
            Command::Quit => self.quit = true,
            Command::Unknown(text) => self.send(&format!("unknown command: {}", text)),
        }
    }

    fn send(&self, msg: &str) {
        println!("{}", msg);
        io::stdout().flush().ok();
    }

    fn cmd_new(&mut self, config_path: Option<&str>) {
        let config = match config_path {
            Some(path) => {
                let text = match fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(e) => {
                        self.send(&format!("error: cannot read {}: {}", path, e));
                        return;
                    }
                };
                match VariantConfig::from_json(&text) {
                    Ok(config) => config,
                    Err(e) => {
                        self.send(&format!("error: {}", e));
                        return;
                    }
                }
            }
            None => self.game.config().clone(),
        };
        match Game::new(config) {
            Ok(game) => {
                self.game = game;
                self.send("ok");
            }
            Err(e) => self.send(&format!("error: {}", e)),
        }
    }

    fn cmd_position(&mut self, fen: Option<&str>, moves: &[String]) {
        let mut config = self.game.config().clone();
        config.start_fen = fen.map(str::to_string);
        let mut game = match Game::new(config) {
            Ok(game) => game,
            Err(e) => {
                self.send(&format!("error: {}", e));
                return;
            }
        };
        for text in moves {
            let Some(m) = game.find_move(text) else {
                self.send(&format!("error: illegal move {} in move list", text));
                return;
            };
            if let Err(e) = game.make_move(m) {
                self.send(&format!("error: {}", e));
                return;
            }
        }
        self.game = game;
        self.send("ok");
    }

    fn cmd_move(&mut self, text: &str) {
        let Some(m) = self.game.find_move(text) else {
            self.send(&format!("error: {} is not a legal move here", text));
            return;
        };
        match self.game.make_move(m) {
            Ok(()) => {
                self.report_state();
            }
            Err(e) => self.send(&format!("error: {}", e)),
        }
    }

    fn cmd_undo(&mut self) {
        if self.game.undo() {
            self.send("ok");
        } else {
            self.send("error: nothing to undo");
        }
    }

    fn cmd_legal(&self) {
        let moves = self.game.legal_moves();
        let list: Vec<String> = moves.iter().map(|m| m.to_string()).collect();
        self.send(&format!("{} legal: {}", list.len(), list.join(" ")));
    }

    fn cmd_go(&mut self, depth: Option<i32>, movetime: Option<u64>, nodes: Option<u64>, infinite: bool) {
        if let Some(reason) = self.game.game_over() {
            self.send(&format!("game over: {}", reason));
            return;
        }
        let explicit = depth.is_some() || movetime.is_some() || nodes.is_some() || infinite;
        let limits = if explicit {
            SearchLimits {
                depth: depth.map(Depth::new),
                movetime,
                nodes,
                infinite: false, // no async stop channel in the CLI
            }
        } else {
            SearchLimits::from_config(&self.game.rules().search)
        };

        let result = self.game.think(Some(limits));
        let stats = &result.stats;
        let pv: Vec<String> = result.pv.iter().map(|m| m.to_string()).collect();
        self.send(&format!(
            "info depth {} seldepth {} score {} nodes {} nps {} time {} pv {}",
            stats.depth,
            stats.seldepth,
            result.score,
            stats.nodes,
            stats.nps(),
            stats.time_ms,
            pv.join(" ")
        ));

        match result.best_move {
            Some(m) => {
                self.send(&format!("bestmove {}", m));
                if self.game.make_move(m).is_ok() {
                    self.report_state();
                }
            }
            None => self.send("bestmove (none)"),
        }
    }

    fn cmd_perft(&self, depth: u32) {
        let depth = depth.min(6);
        let start = std::time::Instant::now();
        let nodes = movegen::perft(self.game.board(), self.game.rules(), depth);
        let ms = start.elapsed().as_millis();
        self.send(&format!("perft {} = {} ({} ms)", depth, nodes, ms));
    }

    fn cmd_eval(&self) {
        let rules = self.game.rules();
        let score = eval::evaluate(self.game.board(), rules, &rules.eval);
        self.send(&format!("info score {} (side to move)", score));
    }

    fn cmd_save(&self, path: &str) {
        let save = self.game.save();
        let json = match serde_json::to_string_pretty(&save) {
            Ok(json) => json,
            Err(e) => {
                self.send(&format!("error: {}", e));
                return;
            }
        };
        match fs::write(path, json) {
            Ok(()) => self.send(&format!("saved to {}", path)),
            Err(e) => self.send(&format!("error: cannot write {}: {}", path, e)),
        }
    }

    fn cmd_load(&mut self, path: &str) {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                self.send(&format!("error: cannot read {}: {}", path, e));
                return;
            }
        };
        let save: GameSave = match serde_json::from_str(&text) {
            Ok(save) => save,
            Err(e) => {
                self.send(&format!("error: {} is not a saved game: {}", path, e));
                return;
            }
        };
        match Game::load(&save) {
            Ok(game) => {
                self.game = game;
                self.send("ok");
            }
            Err(e) => self.send(&format!("error: {}", e)),
        }
    }

    fn report_state(&self) {
        match self.game.game_over() {
            Some(reason) => self.send(&format!("game over: {}", reason)),
            None if self.game.is_in_check() => self.send("check"),
            None => {}
        }
    }

    fn cmd_help(&self) {
        self.send(
            "commands:\n\
             \x20 new [config.json]       start a game (optionally under a variant config)\n\
             \x20 position startpos|fen <fen> [moves ...]\n\
             \x20 move <e2e4>             play a move (promotions: e7e8q)\n\
             \x20 undo                    take back the last move\n\
             \x20 legal                   list legal moves\n\
             \x20 go [depth N] [movetime MS] [nodes N]   let the engine move\n\
             \x20 eval                    static evaluation\n\
             \x20 perft <N>               move-generator node count\n\
             \x20 d | fen                 show the board / FEN\n\
             \x20 save <path> | load <path>\n\
             \x20 quit",
        );
    }
}
