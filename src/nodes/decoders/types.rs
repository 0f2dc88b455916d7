//! Common decoder types and enums

use std::fmt;

/// Required signal behaviour on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Low on the previous sample, high on this one
    Rising,
    /// High on the previous sample, low on this one
    Falling,
    /// Any change between the previous sample and this one
    Either,
    /// Low on this sample (level-triggered)
    Low,
    /// High on this sample (level-triggered)
    High,
}

impl Transition {
    /// Evaluate against the previous and current value of a channel.
    ///
    /// `previous` is `None` at position 0 and for unwired channels, in which
    /// case edge transitions never match.
    #[inline]
    pub fn matches(self, previous: Option<bool>, current: Option<bool>) -> bool {
        match (self, previous, current) {
            (Transition::Rising, Some(false), Some(true)) => true,
            (Transition::Falling, Some(true), Some(false)) => true,
            (Transition::Either, Some(p), Some(c)) => p != c,
            (Transition::Low, _, Some(false)) => true,
            (Transition::High, _, Some(true)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            Transition::Rising => "r",
            Transition::Falling => "f",
            Transition::Either => "e",
            Transition::Low => "l",
            Transition::High => "h",
        };
        write!(f, "{}", tag)
    }
}

/// A set of per-channel transitions that must all hold on the same sample
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeCondition {
    terms: Vec<(usize, Transition)>,
}

impl EdgeCondition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Condition with a single channel term
    pub fn single(channel: usize, transition: Transition) -> Self {
        Self::new().with(channel, transition)
    }

    /// Add a term; a later term on the same channel replaces the earlier one
    pub fn with(mut self, channel: usize, transition: Transition) -> Self {
        self.terms.retain(|(ch, _)| *ch != channel);
        self.terms.push((channel, transition));
        self
    }

    pub fn terms(&self) -> &[(usize, Transition)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for EdgeCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (channel, transition)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: '{}'", channel, transition)?;
        }
        write!(f, "}}")
    }
}

/// A value latched from the bus and the sample position it was taken at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatchedValue {
    pub value: u32,
    pub sample_position: u64,
}

/// One reconstructed bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Sample position of the address latch
    pub start: u64,
    /// Sample position of the data latch
    pub end: u64,
    pub address: u32,
    pub data: u8,
}

impl DecodedEvent {
    /// `AAAA:DD` in uppercase hex
    pub fn annotation_text(&self) -> String {
        format!("{:04X}:{:02X}", self.address, self.data)
    }

    /// Address high byte, address low byte, data byte
    pub fn to_bytes(&self) -> [u8; 3] {
        let [_, _, hi, lo] = self.address.to_be_bytes();
        [hi, lo, self.data]
    }
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}..{}]", self.annotation_text(), self.start, self.end)
    }
}

/// Annotation classes, in output-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationClass {
    Data,
    Address,
    Command,
    Status,
    Warnings,
}

impl AnnotationClass {
    /// Index into the annotation table
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Annotation spanning a range of samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub start: u64,
    pub end: u64,
    pub class: AnnotationClass,
    /// Renderings from longest to shortest
    pub texts: Vec<String>,
}

impl Annotation {
    pub fn from_event(event: &DecodedEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            class: AnnotationClass::Data,
            texts: vec![event.annotation_text()],
        }
    }
}

/// Binary output record spanning a range of samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    pub start: u64,
    pub end: u64,
    /// Index into the binary class table
    pub class: usize,
    pub bytes: Vec<u8>,
}

impl BinaryRecord {
    pub fn from_event(event: &DecodedEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            class: 0,
            bytes: event.to_bytes().to_vec(),
        }
    }
}
