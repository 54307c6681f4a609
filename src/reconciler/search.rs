/// Tag carried by an in-flight search so late results can be recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub token: u64,
    pub query: String,
}

/// Hands out increasing tokens; only the newest ticket is current.
#[derive(Debug, Default)]
pub struct SearchTracker {
    latest: u64,
}

impl SearchTracker {
    pub fn begin(&mut self, query: &str) -> SearchTicket {
        self.latest += 1;
        SearchTicket {
            token: self.latest,
            query: query.to_string(),
        }
    }

    pub fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.token == self.latest
    }
}
