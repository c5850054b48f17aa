use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinSet;

use crate::capability::registry::ProviderRegistry;
use crate::config::{self, AppConfig};
use crate::errors::TextLensResult;
use crate::panel::{PanelSinks, TextPanel};
use crate::sink::{ConsoleSink, TextSink};
use crate::tasks::event_bus::TaskEvent;

const HELP: &str = "\
Type text to set the input, or one of:
  /detect              detect the input's language
  /translate [lang]    detect, then translate the input
  /display             show the input and keep it for /summarize
  /summarize           summarize the input, or the displayed text
  /provider <name>     switch capability provider
  /providers           list providers
  /save                write the current settings to config.toml
  /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    SetInput(String),
    Detect,
    Translate(Option<String>),
    Display,
    Summarize,
    UseProvider(String),
    ListProviders,
    Save,
    Help,
    Quit,
}

/// Lines starting with `/` are commands; anything else becomes the input.
pub fn parse_command(line: &str) -> Option<PanelCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Some(PanelCommand::SetInput(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::to_string);
    let command = match name {
        "detect" => PanelCommand::Detect,
        "translate" => PanelCommand::Translate(arg),
        "display" => PanelCommand::Display,
        "summarize" => PanelCommand::Summarize,
        "provider" => match arg {
            Some(name) => PanelCommand::UseProvider(name),
            None => PanelCommand::ListProviders,
        },
        "providers" => PanelCommand::ListProviders,
        "save" => PanelCommand::Save,
        "quit" | "exit" => PanelCommand::Quit,
        _ => PanelCommand::Help,
    };
    Some(command)
}

fn console_sinks() -> PanelSinks {
    PanelSinks {
        detected: Arc::new(ConsoleSink::stdout("detected")),
        output: Arc::new(ConsoleSink::stdout("output")),
        summary: Arc::new(ConsoleSink::stdout("summary")),
        error: Arc::new(ConsoleSink::stderr("error")),
    }
}

fn build_panel(registry: &ProviderRegistry, config: &AppConfig) -> TextLensResult<Arc<TextPanel>> {
    let provider = registry.get_active()?;
    let panel = Arc::new(TextPanel::new(provider, config, console_sinks()));

    let rx = panel.events().subscribe();
    tokio::spawn(relay_progress(rx, Arc::new(ConsoleSink::stdout("progress"))));
    Ok(panel)
}

/// Shows download progress until the bus closes. Falling behind only skips
/// the events that were overwritten.
async fn relay_progress(mut rx: broadcast::Receiver<TaskEvent>, sink: Arc<dyn TextSink>) {
    loop {
        match rx.recv().await {
            Ok(TaskEvent::DownloadProgress { kind, loaded, total, .. }) => {
                sink.show(&format!("{kind}: {loaded} of {total} bytes"));
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "progress relay fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Reads commands from stdin until `/quit` or end of input.
///
/// Each button-like command runs on its own task, so a summary can be in
/// flight while a translation runs; same-kind commands queue in the panel.
pub async fn console_loop(mut registry: ProviderRegistry, config: AppConfig) -> TextLensResult<()> {
    let mut panel = build_panel(&registry, &config)?;
    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };
        tracing::debug!(?command, "console command");

        match command {
            PanelCommand::SetInput(text) => panel.set_input(text).await,
            PanelCommand::Detect => {
                let panel = panel.clone();
                in_flight.spawn(async move { panel.detect().await });
            }
            PanelCommand::Translate(target) => {
                let panel = panel.clone();
                let target = target.unwrap_or_else(|| config.translator.default_target.clone());
                in_flight.spawn(async move { panel.translate(&target).await });
            }
            PanelCommand::Display => panel.display().await,
            PanelCommand::Summarize => {
                let panel = panel.clone();
                in_flight.spawn(async move { panel.summarize().await });
            }
            PanelCommand::UseProvider(name) => match registry.set_active(name) {
                Ok(()) => {
                    let next = build_panel(&registry, &config)?;
                    next.restore(panel.input().await, panel.displayed().await).await;
                    panel = next;
                    println!("[provider] {}", registry.active_name());
                }
                Err(e) => eprintln!("[error] {e}"),
            },
            PanelCommand::ListProviders => {
                for name in registry.list_names() {
                    let marker = if name == registry.active_name() { "*" } else { " " };
                    println!("{marker} {name}");
                }
            }
            PanelCommand::Save => {
                let mut saved = config.clone();
                saved.backend.active = registry.active_name().to_string();
                match config::save_config(&saved) {
                    Ok(path) => println!("[config] saved to {}", path.display()),
                    Err(e) => eprintln!("[error] {e}"),
                }
            }
            PanelCommand::Help => println!("{HELP}"),
            PanelCommand::Quit => break,
        }

        // Reap finished commands so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    tracing::info!("console closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::types::CapabilityKind;
    use crate::sink::MemorySink;
    use crate::tasks::event_bus::EventBus;

    #[test]
    fn plain_lines_set_the_input() {
        assert_eq!(
            parse_command("Bonjour le monde\n"),
            Some(PanelCommand::SetInput("Bonjour le monde".into()))
        );
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_command("/detect"), Some(PanelCommand::Detect));
        assert_eq!(
            parse_command("/translate fr"),
            Some(PanelCommand::Translate(Some("fr".into())))
        );
        assert_eq!(parse_command("/translate"), Some(PanelCommand::Translate(None)));
        assert_eq!(
            parse_command(" /provider openai"),
            Some(PanelCommand::UseProvider("openai".into()))
        );
        assert_eq!(parse_command("/provider"), Some(PanelCommand::ListProviders));
        assert_eq!(parse_command("/save"), Some(PanelCommand::Save));
        assert_eq!(parse_command("/exit"), Some(PanelCommand::Quit));
        assert_eq!(parse_command("/what"), Some(PanelCommand::Help));
    }

    fn progress(loaded: u64) -> TaskEvent {
        TaskEvent::DownloadProgress {
            invocation: uuid::Uuid::new_v4(),
            kind: CapabilityKind::Summarizer,
            loaded,
            total: 10,
        }
    }

    #[tokio::test]
    async fn progress_relay_survives_falling_behind() {
        let bus = EventBus::with_capacity(1);
        let rx = bus.subscribe();
        bus.publish(progress(1));
        bus.publish(progress(2));
        drop(bus);

        let sink = Arc::new(MemorySink::new());
        relay_progress(rx, sink.clone()).await;

        assert_eq!(sink.entries(), vec!["Summarization: 2 of 10 bytes"]);
    }
}
