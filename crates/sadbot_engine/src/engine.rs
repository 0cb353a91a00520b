use std::sync::Arc;

use sadbot_core::{split_for_transport, Effect, IncomingLine, Planner};
use sadbot_logging::{bot_trace, bot_warn};
use tokio::runtime::Handle;

use crate::fetch::Fetcher;
use crate::preview::PagePreviewer;
use crate::sink::{AuditSink, BuiltinServices, ReplySink};

/// Everything the dispatcher talks to.
pub struct Collaborators {
    pub replies: Arc<dyn ReplySink>,
    pub audit: Arc<dyn AuditSink>,
    pub services: Arc<dyn BuiltinServices>,
    pub fetcher: Arc<dyn Fetcher>,
}

/// Cuts every outgoing text to `split_len` bytes before the transport sees it.
struct BoundedReplies {
    inner: Arc<dyn ReplySink>,
    split_len: usize,
}

impl ReplySink for BoundedReplies {
    fn send(&self, target: &str, text: &str) {
        for chunk in split_for_transport(text, self.split_len) {
            self.inner.send(target, chunk);
        }
    }
}

struct Shared {
    planner: Planner,
    previewer: PagePreviewer,
    replies: BoundedReplies,
    audit: Arc<dyn AuditSink>,
    services: Arc<dyn BuiltinServices>,
}

/// Entry point for incoming lines.
///
/// `dispatch` returns immediately. Each line is planned on its own task and
/// every resulting effect then runs on a further task of its own, with no
/// join and no ordering between them.
#[derive(Clone)]
pub struct Dispatcher {
    runtime: Handle,
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub fn new(
        runtime: Handle,
        planner: Planner,
        split_len: usize,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            replies,
            audit,
            services,
            fetcher,
        } = collaborators;
        Self {
            runtime,
            shared: Arc::new(Shared {
                planner,
                previewer: PagePreviewer::new(fetcher, split_len),
                replies: BoundedReplies {
                    inner: replies,
                    split_len,
                },
                audit,
                services,
            }),
        }
    }

    pub fn dispatch(&self, line: IncomingLine) {
        let shared = self.shared.clone();
        let runtime = self.runtime.clone();
        self.runtime.spawn(async move {
            let effects = shared.planner.plan(&line);
            bot_trace!(
                "{} effect(s) for line from {} in {}",
                effects.len(),
                line.nick,
                line.target
            );
            for effect in effects {
                let shared = shared.clone();
                runtime.spawn(async move { shared.run(effect).await });
            }
        });
    }
}

impl Shared {
    async fn run(&self, effect: Effect) {
        match effect {
            Effect::Reply { target, text } => self.replies.send(&target, &text),
            Effect::Builtin {
                target,
                requester,
                command,
            } => {
                self.services
                    .run(&target, &requester, &command, &self.replies)
                    .await;
            }
            Effect::Preview {
                target,
                url,
                requester,
            } => {
                self.previewer
                    .preview(&url, &target, Some(&requester), &self.replies)
                    .await;
            }
            Effect::Audit(record) => {
                if let Err(err) = self.audit.record(&record).await {
                    bot_warn!(
                        "Failed to log message from {} in {}: {err:#}",
                        record.nick,
                        record.channel
                    );
                }
            }
        }
    }
}
