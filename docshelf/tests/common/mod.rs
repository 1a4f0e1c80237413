#![allow(dead_code)]

use docshelf::prelude::*;
use serde::{Deserialize, Serialize};

pub fn init_logging() {
    let _ = colog::basic_builder().try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
pub struct Ticket {
    pub id: u32,
    pub status: String,
    #[document(rename = "queue")]
    pub team: String,
    #[document(skip)]
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Ticket {
    pub fn new(id: u32, status: &str, team: &str) -> Self {
        Self {
            id,
            status: status.to_string(),
            team: team.to_string(),
            labels: Vec::new(),
        }
    }
}

pub fn ids(tickets: Vec<Ticket>) -> Vec<u32> {
    tickets.into_iter().map(|ticket| ticket.id).collect()
}
