use thiserror::Error;

use crate::model::RecordKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Delete { password: String },
    AddKm { km: i64 },
    Fuel { liters: f64, price: f64 },
    Manu { desc: String, km: i64 },
    Report,
    Pdf,
    Del { kind: RecordKind, index: i64 },
    Debug,
    OilStatus,
}

/// Which command a usage hint is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Delete,
    AddKm,
    Fuel,
    Manu,
    Report,
    Pdf,
    Del,
    Debug,
    OilStatus,
}

/// Checked in order, first match wins. `/delete` must precede `/del`.
const PREFIXES: [(&str, CommandKind); 10] = [
    ("/start", CommandKind::Start),
    ("/delete", CommandKind::Delete),
    ("/addkm", CommandKind::AddKm),
    ("/fuel", CommandKind::Fuel),
    ("/manu", CommandKind::Manu),
    ("/report", CommandKind::Report),
    ("/pdf", CommandKind::Pdf),
    ("/del", CommandKind::Del),
    ("/debug", CommandKind::Debug),
    ("/statusoleo", CommandKind::OilStatus),
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("not a bot command")]
    NotACommand,
    #[error("bad arguments for {0:?}")]
    Usage(CommandKind),
    #[error("unknown record kind {0:?}")]
    UnknownKind(String),
    #[error("missing index for {0}")]
    MissingIndex(RecordKind),
}

impl ParseError {
    /// Reply sent back to the chat. `None` when the message should be ignored.
    pub fn user_message(&self) -> Option<String> {
        let text = match self {
            ParseError::NotACommand => return None,
            ParseError::Usage(kind) => usage(*kind).to_string(),
            ParseError::UnknownKind(_) => "❌ Tipo inválido. Use: km, fuel ou manu".to_string(),
            ParseError::MissingIndex(kind) => format!("❌ Use: `/del {} 1`", kind),
        };
        Some(text)
    }
}

pub fn usage(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Delete => {
            "❌ Use: `/delete SENHA`\n\n⚠️ *ATENÇÃO:* Este comando apaga TODOS os dados permanentemente!"
        }
        CommandKind::AddKm => "❌ Use: `/addkm 15000`",
        CommandKind::Fuel => "❌ Use: `/fuel 10 5.50`",
        CommandKind::Manu => "❌ Use: `/manu Descrição KM`\nEx: `/manu Troca de óleo 15000`",
        CommandKind::Del => "❌ Use: `/del km 1` ou `/del fuel 1` ou `/del manu 1`",
        CommandKind::Start
        | CommandKind::Report
        | CommandKind::Pdf
        | CommandKind::Debug
        | CommandKind::OilStatus => "❌ Comando inválido. Use /start para ver os comandos",
    }
}

/// Largest odometer value accepted from the chat.
pub const MAX_KM: i64 = 10_000_000;

fn positive_int(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|v| (1..=MAX_KM).contains(v))
}

/// Accepts `5.50` as well as `5,50`.
fn positive_amount(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

impl Command {
    pub fn parse(text: &str) -> Result<Command, ParseError> {
        let text = text.trim();
        let kind = PREFIXES
            .iter()
            .find(|(prefix, _)| text.starts_with(prefix))
            .map(|(_, kind)| *kind)
            .ok_or(ParseError::NotACommand)?;

        let args: Vec<&str> = text.split_whitespace().skip(1).collect();
        let usage_err = ParseError::Usage(kind);

        let cmd = match kind {
            CommandKind::Start => Command::Start,
            CommandKind::Report => Command::Report,
            CommandKind::Pdf => Command::Pdf,
            CommandKind::Debug => Command::Debug,
            CommandKind::OilStatus => Command::OilStatus,
            CommandKind::Delete => {
                let password = args.first().ok_or(usage_err)?;
                Command::Delete { password: password.to_string() }
            }
            CommandKind::AddKm => {
                let km = args.first().and_then(|v| positive_int(v)).ok_or(usage_err)?;
                Command::AddKm { km }
            }
            CommandKind::Fuel => {
                let liters = args.first().and_then(|v| positive_amount(v));
                let price = args.get(1).and_then(|v| positive_amount(v));
                match (liters, price) {
                    (Some(liters), Some(price)) => Command::Fuel { liters, price },
                    _ => return Err(usage_err),
                }
            }
            CommandKind::Manu => {
                let Some((last, desc)) = args.split_last() else {
                    return Err(usage_err);
                };
                if desc.is_empty() {
                    return Err(usage_err);
                }
                let km = positive_int(last).ok_or(usage_err)?;
                Command::Manu { desc: desc.join(" "), km }
            }
            CommandKind::Del => match args.as_slice() {
                [] => return Err(usage_err),
                [kind] => {
                    let kind = kind
                        .parse::<RecordKind>()
                        .map_err(|_| ParseError::UnknownKind(kind.to_string()))?;
                    return Err(ParseError::MissingIndex(kind));
                }
                [kind, index, ..] => {
                    let kind = kind
                        .parse::<RecordKind>()
                        .map_err(|_| ParseError::UnknownKind(kind.to_string()))?;
                    // Zero and negatives parse here and are rejected against the list length.
                    let index = index.parse::<i64>().map_err(|_| usage_err)?;
                    Command::Del { kind, index }
                }
            },
        };
        Ok(cmd)
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Start => CommandKind::Start,
            Command::Delete { .. } => CommandKind::Delete,
            Command::AddKm { .. } => CommandKind::AddKm,
            Command::Fuel { .. } => CommandKind::Fuel,
            Command::Manu { .. } => CommandKind::Manu,
            Command::Report => CommandKind::Report,
            Command::Pdf => CommandKind::Pdf,
            Command::Del { .. } => CommandKind::Del,
            Command::Debug => CommandKind::Debug,
            Command::OilStatus => CommandKind::OilStatus,
        }
    }
}

/// Command menu registered with Telegram: `(command, description)`.
pub const MENU: [(&str, &str); 9] = [
    ("start", "Mostra os comandos"),
    ("addkm", "Define os KMs atuais"),
    ("fuel", "Registra abastecimento: litros valor"),
    ("manu", "Registra manutenção: descrição km"),
    ("report", "Resumo geral"),
    ("pdf", "Relatório completo em PDF"),
    ("del", "Apaga um registro: tipo índice"),
    ("statusoleo", "Situação da troca de óleo"),
    ("debug", "Informações de diagnóstico"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(Command::parse("/start"), Ok(Command::Start));
        assert_eq!(Command::parse("/report"), Ok(Command::Report));
        assert_eq!(Command::parse("/pdf"), Ok(Command::Pdf));
        assert_eq!(Command::parse("/debug"), Ok(Command::Debug));
        assert_eq!(Command::parse("/statusoleo"), Ok(Command::OilStatus));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("olá"), Err(ParseError::NotACommand));
        assert_eq!(Command::parse("/unknown"), Err(ParseError::NotACommand));
        assert_eq!(ParseError::NotACommand.user_message(), None);
    }

    #[test]
    fn delete_takes_priority_over_del() {
        assert_eq!(
            Command::parse("/delete s3cr3t"),
            Ok(Command::Delete { password: "s3cr3t".to_string() })
        );
        assert_eq!(Command::parse("/delete"), Err(ParseError::Usage(CommandKind::Delete)));
    }

    #[test]
    fn addkm_requires_positive_integer() {
        assert_eq!(Command::parse("/addkm 15000"), Ok(Command::AddKm { km: 15000 }));
        assert_eq!(Command::parse("/addkm@moto_bot 15000"), Ok(Command::AddKm { km: 15000 }));
        assert_eq!(Command::parse("/addkm 10000000"), Ok(Command::AddKm { km: MAX_KM }));
        for bad in ["/addkm", "/addkm abc", "/addkm 0", "/addkm -5", "/addkm 15.5", "/addkm 10000001"] {
            assert_eq!(Command::parse(bad), Err(ParseError::Usage(CommandKind::AddKm)), "{}", bad);
        }
    }

    #[test]
    fn fuel_accepts_decimal_comma() {
        assert_eq!(Command::parse("/fuel 10 5.50"), Ok(Command::Fuel { liters: 10.0, price: 5.5 }));
        assert_eq!(Command::parse("/fuel 7,5 42,90"), Ok(Command::Fuel { liters: 7.5, price: 42.9 }));
        for bad in ["/fuel", "/fuel 10", "/fuel x 5", "/fuel 10 -1", "/fuel inf 5", "/fuel NaN 5"] {
            assert_eq!(Command::parse(bad), Err(ParseError::Usage(CommandKind::Fuel)), "{}", bad);
        }
    }

    #[test]
    fn manu_takes_last_token_as_km() {
        assert_eq!(
            Command::parse("/manu Troca de óleo 15000"),
            Ok(Command::Manu { desc: "Troca de óleo".to_string(), km: 15000 })
        );
        for bad in [
            "/manu",
            "/manu 15000",
            "/manu Troca de óleo",
            "/manu Pneu 12x",
            "/manu Troca de oleo 9223372036854775807",
        ] {
            assert_eq!(Command::parse(bad), Err(ParseError::Usage(CommandKind::Manu)), "{}", bad);
        }
    }

    #[test]
    fn del_validates_kind_and_index() {
        assert_eq!(
            Command::parse("/del manu 1"),
            Ok(Command::Del { kind: RecordKind::Manu, index: 1 })
        );
        assert_eq!(Command::parse("/del"), Err(ParseError::Usage(CommandKind::Del)));
        assert_eq!(Command::parse("/del fuel"), Err(ParseError::MissingIndex(RecordKind::Fuel)));
        assert_eq!(
            Command::parse("/del oil 1"),
            Err(ParseError::UnknownKind("oil".to_string()))
        );
        assert_eq!(Command::parse("/del km x"), Err(ParseError::Usage(CommandKind::Del)));
    }

    #[test]
    fn del_keeps_non_positive_index_for_range_check() {
        assert_eq!(Command::parse("/del km -1"), Ok(Command::Del { kind: RecordKind::Km, index: -1 }));
        assert_eq!(Command::parse("/del fuel 0"), Ok(Command::Del { kind: RecordKind::Fuel, index: 0 }));
    }

    #[test]
    fn errors_map_to_replies() {
        assert_eq!(
            ParseError::MissingIndex(RecordKind::Km).user_message().unwrap(),
            "❌ Use: `/del km 1`"
        );
        assert!(ParseError::Usage(CommandKind::Fuel).user_message().unwrap().contains("/fuel 10 5.50"));
        assert!(ParseError::UnknownKind("x".into()).user_message().unwrap().contains("Tipo inválido"));
    }
}
