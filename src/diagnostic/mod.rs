//! Mergeable diagnostic chains
//!
//! A [`Diagnostic`] is either the empty sentinel or the newest [`Record`] of a
//! singly-linked history. Each record exclusively owns the link to the record
//! reported before it, so a chain can never contain the same record twice.
//!
//! Merging two chains keeps the newer head in front and hangs the older
//! chain off the newer chain's oldest record; nothing is ever dropped. The
//! worst status across the whole history decides whether the chain failed.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

pub mod factory;
pub mod input;
pub mod status;


pub use factory::DiagnosticFactory;
pub use input::{ErrorValue, LogInput, LogParts};
pub use status::{describe_status, is_failure, StatusCode};

static EMPTY_PAYLOAD: Lazy<Map<String, Value>> = Lazy::new(Map::new);

/// One reported outcome
#[derive(Serialize)]
pub struct Record {
    status: u16,
    message: Option<String>,
    display: String,
    payload: Map<String, Value>,
    /// Worst status over this record and everything before it
    #[serde(skip)]
    highest: u16,
    #[serde(skip)]
    previous: Option<Box<Record>>,
}

impl Record {
    pub(crate) fn new(
        status: u16,
        message: Option<String>,
        display: String,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            status,
            message,
            display,
            payload,
            highest: status,
            previous: None,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Text that is safe to show to an end user
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The record reported immediately before this one
    pub fn previous(&self) -> Option<&Record> {
        self.previous.as_deref()
    }

    pub fn failed(&self) -> bool {
        is_failure(self.highest)
    }

    /// Maximum status over this record and everything before it
    pub fn highest_level(&self) -> u16 {
        self.highest
    }

    /// Hang `older` below the oldest record, raising every cached worst status
    /// on the way down.
    fn attach_oldest(&mut self, older: Box<Record>) {
        let inherited = older.highest;
        self.highest = self.highest.max(inherited);
        let mut tail = &mut self.previous;
        while let Some(record) = tail {
            record.highest = record.highest.max(inherited);
            tail = &mut record.previous;
        }
        *tail = Some(older);
    }

    /// Copy of this record's own fields, unlinked
    fn detached(&self) -> Record {
        Record {
            status: self.status,
            message: self.message.clone(),
            display: self.display.clone(),
            payload: self.payload.clone(),
            highest: self.highest,
            previous: None,
        }
    }

    fn same_fields(&self, other: &Record) -> bool {
        self.status == other.status
            && self.message == other.message
            && self.display == other.display
            && self.payload == other.payload
    }

    fn iter(&self) -> Iter<'_> {
        Iter { next: Some(self) }
    }
}

// Clone, PartialEq and Debug walk the history in a loop, never recursing per record.
impl Clone for Record {
    fn clone(&self) -> Self {
        let mut older: Vec<&Record> = self.iter().skip(1).collect();
        let mut previous: Option<Box<Record>> = None;
        while let Some(record) = older.pop() {
            let mut copy = record.detached();
            copy.previous = previous;
            previous = Some(Box::new(copy));
        }
        let mut head = self.detached();
        head.previous = previous;
        head
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.iter();
        let mut right = other.iter();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a.same_fields(b) => {}
                _ => return false,
            }
        }
    }
}

struct RecordFields<'a>(&'a Record);

impl fmt::Debug for RecordFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("status", &self.0.status)
            .field("message", &self.0.message)
            .field("display", &self.0.display)
            .field("payload", &self.0.payload)
            .finish()
    }
}

impl fmt::Debug for Record {
    /// Newest first, one entry per record
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(RecordFields)).finish()
    }
}

impl Drop for Record {
    // Unlink iteratively; recursive drop of a long history would exhaust the stack.
    fn drop(&mut self) {
        let mut next = self.previous.take();
        while let Some(mut record) = next {
            next = record.previous.take();
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "[{}] {}", self.status, message),
            None => write!(f, "[{}] {}", self.status, describe_status(self.status)),
        }
    }
}

/// A running diagnostic chain; `None` is the empty sentinel
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Diagnostic {
    /// Nothing reported. Reads as status 200 with an empty, immutable payload.
    #[default]
    None,
    Chain(Box<Record>),
}

impl Diagnostic {
    pub const fn none() -> Self {
        Diagnostic::None
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Diagnostic::None)
    }

    /// The most recent record, if any
    pub fn head(&self) -> Option<&Record> {
        match self {
            Diagnostic::None => None,
            Diagnostic::Chain(record) => Some(record),
        }
    }

    pub fn status(&self) -> u16 {
        self.head().map_or(StatusCode::OK, Record::status)
    }

    pub fn message(&self) -> Option<&str> {
        self.head().and_then(Record::message)
    }

    pub fn display(&self) -> Option<&str> {
        self.head().map(Record::display)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        match self {
            Diagnostic::None => &EMPTY_PAYLOAD,
            Diagnostic::Chain(record) => record.payload(),
        }
    }

    pub fn previous(&self) -> Option<&Record> {
        self.head().and_then(Record::previous)
    }

    pub fn highest_level(&self) -> u16 {
        match self {
            Diagnostic::None => StatusCode::OK,
            Diagnostic::Chain(record) => record.highest_level(),
        }
    }

    pub fn failed(&self) -> bool {
        is_failure(self.highest_level())
    }

    /// Number of records in the chain
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.is_none()
    }

    /// Records from newest to oldest
    pub fn iter(&self) -> Iter<'_> {
        Iter { next: self.head() }
    }

    /// Records from oldest to newest
    pub fn history(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.iter().collect();
        records.reverse();
        records
    }

    /// Chain `next` on top of `prev`, keeping every record from both.
    ///
    /// The sentinel is the identity on either side. Otherwise `next` stays at
    /// the head and `prev` is attached below `next`'s oldest record.
    pub fn merge(prev: Diagnostic, next: Diagnostic) -> Diagnostic {
        match (prev, next) {
            (Diagnostic::None, next) => next,
            (prev, Diagnostic::None) => prev,
            (Diagnostic::Chain(older), Diagnostic::Chain(mut newer)) => {
                newer.attach_oldest(older);
                Diagnostic::Chain(newer)
            }
        }
    }

    /// Report `newer` as having happened after this chain.
    ///
    /// An empty `newer` leaves this chain as it is.
    pub fn propagate(self, newer: Diagnostic) -> Diagnostic {
        Diagnostic::merge(self, newer)
    }

    /// Replace the head record's payload. The sentinel is left untouched.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        if let Diagnostic::Chain(record) = &mut self {
            record.payload = payload;
        }
        self
    }

    /// Convert a failing chain into an [`Error::Failed`] at a host boundary.
    ///
    /// The error reports the newest record carrying the worst status.
    pub fn into_result(self) -> Result<Diagnostic> {
        if !self.failed() {
            return Ok(self);
        }

        let highest = self.highest_level();
        let message = self
            .iter()
            .find(|record| record.status() == highest)
            .map(|record| match record.message() {
                Some(message) => message.to_string(),
                None => describe_status(highest).to_string(),
            })
            .unwrap_or_else(|| describe_status(highest).to_string());

        Err(Error::Failed {
            status: highest,
            message,
        })
    }
}

impl From<Record> for Diagnostic {
    fn from(record: Record) -> Self {
        Diagnostic::Chain(Box::new(record))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.head() {
            None => write!(f, "[{}] {}", StatusCode::OK, describe_status(StatusCode::OK)),
            Some(record) => fmt::Display::fmt(record, f),
        }
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for record in self.iter() {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}

/// Iterator over a chain, newest record first
pub struct Iter<'a> {
    next: Option<&'a Record>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.previous();
        Some(current)
    }
}

impl<'a> IntoIterator for &'a Diagnostic {
    type Item = &'a Record;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
