use crate::{harvest, AuditRecord, BotConfig, CommandRouter, Effect, IncomingLine};

/// Turns an incoming line into the independent effects the engine will run.
#[derive(Debug, Clone)]
pub struct Planner {
    own_nick: String,
    router: CommandRouter,
}

impl Planner {
    pub fn new(own_nick: impl Into<String>, router: CommandRouter) -> Self {
        Self {
            own_nick: own_nick.into(),
            router,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            config.nick.clone(),
            CommandRouter::new(config.admin.clone(), config.commands.clone()),
        )
    }

    /// Commands first, then one preview per admitted link, then the audit row.
    pub fn plan(&self, line: &IncomingLine) -> Vec<Effect> {
        let target = line.reply_target(&self.own_nick);
        let mut effects = self.router.route(line, target);

        effects.extend(harvest(&line.text).into_vec().into_iter().map(|url| {
            Effect::Preview {
                target: target.to_string(),
                url,
                requester: line.nick.clone(),
            }
        }));

        effects.push(Effect::Audit(AuditRecord::from_line(line, target)));
        effects
    }
}
