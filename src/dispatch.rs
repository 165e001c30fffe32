use std::sync::Arc;

use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};
use tracing::{info, warn};

use crate::commands::{Command, ParseError};
use crate::dates::format_stamp;
use crate::db::Db;
use crate::model::{FuelPurchase, MaintenanceEvent, OdometerReading, RecordKind};
use crate::oil::{is_oil_change, oil_alert};
use crate::{pdf, report};

pub const HELP: &str = "🏍️ *BOT MANUTENÇÃO - POPzinha*\n\n\
📊 *REGISTROS:*\n\
• /addkm KMsAtuais — Define os KMs Atuais\n\
• /fuel Litros Valor — Registra abastecimento\n\
• /manu Descrição KM — Registra manutenção\n\n\
📋 *CONSULTAS:*\n\
• /report — Resumo geral (últimos 4 registros)\n\
• /pdf — Gera relatório completo em PDF\n\
• /statusoleo — Situação da troca de óleo\n\n\
⚙️ *GERENCIAMENTO:*\n\
• /del km Índice — Deleta KM\n\
• /del fuel Índice — Deleta abastecimento\n\
• /del manu Índice — Deleta manutenção\n\n\
🔔 *ALERTAS:*\n\
• Alertas automáticos para troca de óleo\n\
💡 *Dica:* Clique e segure nos comandos para usar!";

pub const NOT_PERSISTED: &str =
    "⚠️ Registro aplicado, mas não foi possível salvar no armazenamento remoto.";
pub const PDF_SENT: &str = "✅ PDF enviado com sucesso!";
pub const PDF_SEND_FAILED: &str = "❌ Erro ao enviar PDF";

/// One outbound message, in the order it must be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Document { file_name: String, bytes: Vec<u8> },
}

impl Reply {
    fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("km {0} is already the last reading")]
    KmAlreadyCurrent(i64),
    #[error("index {index} out of range for {kind} ({len} entries)")]
    IndexOutOfRange { kind: RecordKind, index: i64, len: usize },
    #[error("wrong delete password")]
    WrongPassword,
    #[error("delete password not configured")]
    DeleteDisabled,
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}

impl CommandError {
    pub fn user_message(&self) -> String {
        match self {
            CommandError::KmAlreadyCurrent(km) => format!("⚠️ KM {} já é o último registrado", km),
            CommandError::IndexOutOfRange { kind, len, .. } => {
                format!("❌ Índice inválido para {}. Use de 1 a {}", kind, len)
            }
            CommandError::WrongPassword => "❌ Senha incorreta! Operação cancelada.".to_string(),
            CommandError::DeleteDisabled => {
                "❌ Exclusão total desativada: DELETE_PASSWORD não configurada.".to_string()
            }
            CommandError::Pdf(_) => "❌ Erro ao gerar PDF".to_string(),
        }
    }
}

/// Shared state every command runs against.
pub struct App {
    pub db: Arc<Db>,
    pub delete_password: Option<String>,
    pub notification_chat: Option<i64>,
    pub utc_offset: UtcOffset,
}

impl App {
    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.utc_offset)
    }

    /// Parses and runs one chat message. Messages that are not commands yield no replies.
    pub async fn respond(&self, text: &str, now: OffsetDateTime) -> Vec<Reply> {
        match Command::parse(text) {
            Ok(cmd) => self.execute(&cmd, now).await,
            Err(err) => {
                if err != ParseError::NotACommand {
                    info!(error = %err, "Rejected command arguments");
                }
                err.user_message().map(Reply::Text).into_iter().collect()
            }
        }
    }

    pub async fn execute(&self, cmd: &Command, now: OffsetDateTime) -> Vec<Reply> {
        match self.run(cmd, now).await {
            Ok(replies) => replies,
            Err(err) => {
                warn!(command = ?cmd.kind(), error = %err, "Command failed");
                vec![Reply::Text(err.user_message())]
            }
        }
    }

    async fn run(&self, cmd: &Command, now: OffsetDateTime) -> Result<Vec<Reply>, CommandError> {
        let stamp = format_stamp(now);
        let mut replies = Vec::new();

        match cmd {
            Command::Start => replies.push(Reply::text(HELP)),

            Command::Delete { password } => {
                let expected = self.delete_password.as_deref().ok_or(CommandError::DeleteDisabled)?;
                if password != expected {
                    return Err(CommandError::WrongPassword);
                }
                let m = self
                    .db
                    .mutate(|doc| {
                        let counts = (doc.km.len(), doc.fuel.len(), doc.manu.len());
                        doc.clear();
                        Ok::<_, CommandError>(counts)
                    })
                    .await?;
                let (km, fuel, manu) = m.value;
                info!(km, fuel, manu, "All records deleted");
                replies.push(Reply::Text(format!(
                    "🗑️🚨 *TODOS OS DADOS FORAM DELETADOS!*\n\n\
                     • {} registros de KM removidos\n\
                     • {} abastecimentos removidos\n\
                     • {} manutenções removidas\n\n\
                     *SISTEMA REINICIADO*",
                    km, fuel, manu
                )));
                if !m.persisted {
                    replies.push(Reply::text(NOT_PERSISTED));
                }
            }

            Command::AddKm { km } => {
                let km = *km;
                let m = self
                    .db
                    .mutate(|doc| {
                        if doc.last_km() == km {
                            return Err(CommandError::KmAlreadyCurrent(km));
                        }
                        doc.km.push(OdometerReading { km, date: stamp.clone() });
                        Ok(doc.clone())
                    })
                    .await?;
                let doc = m.value;
                replies.push(Reply::Text(format!("✅ KM registrado: {} km", km)));
                if !m.persisted {
                    replies.push(Reply::text(NOT_PERSISTED));
                }
                replies.push(Reply::Text(report::summary(&doc, now)));
                replies.extend(oil_alert(&doc, km).map(|alert| Reply::Text(alert.message())));
            }

            Command::Fuel { liters, price } => {
                let purchase = FuelPurchase { liters: *liters, price: *price, date: stamp.clone() };
                let m = self
                    .db
                    .mutate(|doc| {
                        doc.fuel.push(purchase);
                        Ok::<_, CommandError>(doc.clone())
                    })
                    .await?;
                let doc = m.value;
                replies.push(Reply::Text(format!(
                    "⛽ Abastecimento: {}L a R$ {:.2}",
                    report::fmt_liters(*liters),
                    price
                )));
                if !m.persisted {
                    replies.push(Reply::text(NOT_PERSISTED));
                }
                replies.push(Reply::Text(report::summary(&doc, now)));
                replies.extend(oil_alert(&doc, doc.last_km()).map(|alert| Reply::Text(alert.message())));
            }

            Command::Manu { desc, km } => {
                let km = *km;
                let m = self
                    .db
                    .mutate(|doc| {
                        let km_added = doc.last_km() != km;
                        if km_added {
                            doc.km.push(OdometerReading { km, date: stamp.clone() });
                        }
                        doc.manu.push(MaintenanceEvent {
                            desc: desc.clone(),
                            date: stamp.clone(),
                            km,
                            price: None,
                        });
                        Ok::<_, CommandError>((km_added, doc.clone()))
                    })
                    .await?;
                let (km_added, doc) = m.value;
                let note = if km_added {
                    "✅ KM registrado automaticamente"
                } else {
                    "ℹ️ KM já estava registrado"
                };
                replies.push(Reply::Text(format!(
                    "🧰 Manutenção registrada: {} | {} Km\n{}",
                    desc, km, note
                )));
                if !m.persisted {
                    replies.push(Reply::text(NOT_PERSISTED));
                }
                replies.push(Reply::Text(report::summary(&doc, now)));
                if is_oil_change(desc) {
                    replies.push(Reply::text("🔧 *TROCA DE ÓLEO REGISTRADA! PRÓXIMO ALERTA EM 1000KM*"));
                } else {
                    replies.extend(oil_alert(&doc, doc.last_km()).map(|alert| Reply::Text(alert.message())));
                }
            }

            Command::Report => {
                let doc = self.db.snapshot().await;
                replies.push(Reply::Text(report::summary(&doc, now)));
                let current = doc.last_km();
                if current > 0 {
                    replies.extend(oil_alert(&doc, current).map(|alert| Reply::Text(alert.message())));
                }
            }

            Command::Pdf => {
                let doc = self.db.snapshot().await;
                let bytes = pdf::render(&pdf::document_lines(&doc, now))
                    .map_err(|err| CommandError::Pdf(format!("{:#}", err)))?;
                replies.push(Reply::text("📄 Gerando relatório completo em PDF..."));
                replies.push(Reply::Document { file_name: pdf::file_name(now), bytes });
            }

            Command::Del { kind, index } => {
                let (kind, index) = (*kind, *index);
                let m = self
                    .db
                    .mutate(|doc| {
                        let removed =
                            usize::try_from(index).map_or(false, |at| doc.remove(kind, at));
                        if !removed {
                            return Err(CommandError::IndexOutOfRange {
                                kind,
                                index,
                                len: doc.len_of(kind),
                            });
                        }
                        Ok(doc.clone())
                    })
                    .await?;
                info!(kind = %kind, index, "Record removed");
                replies.push(Reply::text("🗑️ Registro removido!"));
                if !m.persisted {
                    replies.push(Reply::text(NOT_PERSISTED));
                }
                replies.push(Reply::Text(report::summary(&m.value, now)));
            }

            Command::Debug => {
                let doc = self.db.snapshot().await;
                replies.push(Reply::Text(report::debug_info(
                    &doc,
                    self.notification_chat,
                    &self.db.describe(),
                    now,
                )));
            }

            Command::OilStatus => {
                let doc = self.db.snapshot().await;
                replies.push(Reply::Text(report::oil_status(&doc)));
            }
        }

        Ok(replies)
    }
}
