//! `readwatch watch`: drive the tab host from JSON-lines tab events.
//!
//! Each stdin line is one event, e.g.
//! `{"event":"navigate","tab":1,"url":"https://blog.example.com/post"}`.
//! Navigations without inline `html` are fetched. Notifications are printed
//! to stdout as they fire.

use std::collections::HashMap;
use std::sync::Arc;

use color_eyre::eyre::Result;
use readwatch_core::{Coordinator, TabHost};
use readwatch_shared::{AppConfig, LocalStore, Notification, TabId};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::commands::{fetch_page, http_client, start_model_loading};

/// A browser tab event. `tab` is the caller's own tab number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub(crate) enum TabEvent {
    Navigate {
        tab: u32,
        url: String,
        #[serde(default)]
        html: Option<String>,
    },
    Hide {
        tab: u32,
    },
    Close {
        tab: u32,
    },
    Activate {
        tab: u32,
    },
}

/// Parse one input line. Blank lines yield `None`.
pub(crate) fn parse_event(line: &str) -> serde_json::Result<Option<TabEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

pub(crate) async fn run(config: AppConfig, store: Arc<LocalStore>) -> Result<()> {
    if !store.is_authenticated() {
        warn!("not logged in; background analysis stays off until you log in");
    }

    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<Notification>();
    let host = Arc::new(
        TabHost::new(store.clone(), config.coordinator.probe_timeout())
            .with_notification_sink(notify_tx),
    );
    let (coordinator, task) = Coordinator::spawn(host.clone(), store.clone(), &config.coordinator);
    host.connect(coordinator.clone());
    let (_engine, _loader) = start_model_loading(&config, &coordinator, false)?;

    let printer = tokio::spawn(async move {
        while let Some(notification) = notify_rx.recv().await {
            println!("{}: {}", notification.title, notification.message);
        }
    });

    let client = http_client(&config)?;
    let mut tabs: HashMap<u32, TabId> = HashMap::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let event = match parse_event(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "ignoring malformed event");
                continue;
            }
        };
        debug!(?event, "tab event");

        let result = match event {
            TabEvent::Navigate { tab, url, html } => {
                let html = match html {
                    Some(html) => html,
                    None => match fetch_page(&client, &url).await {
                        Ok(html) => html,
                        Err(e) => {
                            warn!(tab, %url, error = %e, "could not load page");
                            continue;
                        }
                    },
                };
                match tabs.get(&tab).copied() {
                    Some(id) => host.navigate(id, &url, html).await,
                    None => host.open_tab(&url, html).await.map(|id| {
                        tabs.insert(tab, id);
                    }),
                }
            }
            TabEvent::Hide { tab } => match tabs.get(&tab).copied() {
                Some(id) => host.hide(id).await,
                None => {
                    warn!(tab, "hide for unknown tab");
                    continue;
                }
            },
            TabEvent::Activate { tab } => match tabs.get(&tab).copied() {
                Some(id) => host.activate(id).await,
                None => {
                    warn!(tab, "activate for unknown tab");
                    continue;
                }
            },
            TabEvent::Close { tab } => match tabs.remove(&tab) {
                Some(id) => host.close(id).await,
                None => {
                    warn!(tab, "close for unknown tab");
                    continue;
                }
            },
        };
        if let Err(e) = result {
            warn!(error = %e, "tab event failed");
        }
    }

    if let Some(snapshot) = coordinator.snapshot().await {
        info!(pending = snapshot.pending.len(), "input closed, stopping");
    }
    coordinator.shutdown();
    let _ = task.await;
    drop(host);
    let _ = printer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigate_with_and_without_html() {
        let event = parse_event(r#"{"event":"navigate","tab":1,"url":"https://a.example.com/"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            TabEvent::Navigate {
                tab: 1,
                url: "https://a.example.com/".into(),
                html: None,
            }
        );

        let event = parse_event(
            r#"{"event":"navigate","tab":2,"url":"https://a.example.com/","html":"<p>x</p>"}"#,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(event, TabEvent::Navigate { html: Some(_), .. }));
    }

    #[test]
    fn parses_tab_lifecycle_events() {
        assert_eq!(
            parse_event(r#"{"event":"hide","tab":3}"#).unwrap(),
            Some(TabEvent::Hide { tab: 3 })
        );
        assert_eq!(
            parse_event(r#"{"event":"close","tab":3}"#).unwrap(),
            Some(TabEvent::Close { tab: 3 })
        );
        assert_eq!(
            parse_event(r#"{"event":"activate","tab":3}"#).unwrap(),
            Some(TabEvent::Activate { tab: 3 })
        );
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert_eq!(parse_event("   ").unwrap(), None);
        assert!(parse_event(r#"{"event":"reload","tab":1}"#).is_err());
        assert!(parse_event("not json").is_err());
    }
}
