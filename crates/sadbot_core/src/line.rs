use chrono::{DateTime, Utc};

/// Which protocol command carried the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Privmsg,
    /// CTCP ACTION (`/me does something`).
    Action,
}

impl LineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LineKind::Privmsg => "PRIVMSG",
            LineKind::Action => "ACTION",
        }
    }
}

/// One message-type event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingLine {
    pub nick: String,
    pub ident: String,
    pub host: String,
    /// Raw source prefix as received (`nick!ident@host`).
    pub source: String,
    pub kind: LineKind,
    /// Channel or nick the line was addressed to.
    pub target: String,
    pub text: String,
    pub time: DateTime<Utc>,
}

impl IncomingLine {
    /// Where replies to this line go: private messages to the bot are answered
    /// to the sender, everything else to the channel it arrived on.
    pub fn reply_target(&self, own_nick: &str) -> &str {
        if self.target.eq_ignore_ascii_case(own_nick) {
            &self.nick
        } else {
            &self.target
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(target: &str) -> IncomingLine {
        IncomingLine {
            nick: "alice".into(),
            ident: "~a".into(),
            host: "example.org".into(),
            source: "alice!~a@example.org".into(),
            kind: LineKind::Privmsg,
            target: target.into(),
            text: "hi".into(),
            time: Utc::now(),
        }
    }

    #[test]
    fn channel_lines_reply_to_channel() {
        assert_eq!(line("#rust").reply_target("sadbot"), "#rust");
    }

    #[test]
    fn private_lines_reply_to_sender() {
        assert_eq!(line("SadBot").reply_target("sadbot"), "alice");
    }
}
