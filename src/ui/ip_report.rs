//! Plays the device IP address on the buzzer.
//!
//! Each digit `d` is an ascending scale of `d` notes starting at C4
//! (`0` plays ten), followed by a pause.  A dot plays C5, a space is
//! silence, and the sequence ends on C6.

use core::net::Ipv4Addr;

const SCALE_HZ: [u32; 10] = [262, 277, 294, 311, 330, 349, 370, 392, 415, 440];
const DOT_HZ: u32 = 523;
const END_HZ: u32 = 1047;

const NOTE_MS: u64 = 500;
const PAUSE_MS: u64 = 1000;
const GAP_MS: u64 = 100;

#[derive(Debug, Clone, Default)]
pub struct IpReporter {
    text: Vec<u8>,
    digit: usize,
    note: usize,
    next_at: Option<u64>,
}

impl IpReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.next_at.is_some()
    }

    /// Start playing `ip`.  Restarts any report in progress.
    pub fn start(&mut self, ip: Ipv4Addr, now_ms: u64) {
        self.text = ip.to_string().replace('.', ". ").into_bytes();
        self.digit = 0;
        self.note = 0;
        self.next_at = Some(now_ms);
    }

    /// Returns the tone to set (0 = silence) when a step is due.
    pub fn poll(&mut self, now_ms: u64) -> Option<u32> {
        let due = self.next_at?;
        if now_ms < due {
            return None;
        }
        let (tone, delay) = self.step();
        self.next_at = delay.map(|d| now_ms + d);
        tone
    }

    fn step(&mut self) -> (Option<u32>, Option<u64>) {
        let len = self.text.len();
        if self.digit == len {
            self.digit += 1;
            return (Some(END_HZ), Some(PAUSE_MS));
        }
        if self.digit > len {
            return (Some(0), None);
        }

        match self.text[self.digit] {
            b' ' => {
                self.digit += 1;
                self.note = 0;
                (Some(0), Some(PAUSE_MS))
            }
            b'.' => {
                self.digit += 1;
                self.note = 0;
                (Some(DOT_HZ), Some(NOTE_MS))
            }
            c @ b'0'..=b'9' => {
                let idx = if c == b'0' { 9 } else { usize::from(c - b'1') };
                if self.note == idx + 1 {
                    self.note += 1;
                    (Some(0), Some(PAUSE_MS))
                } else if self.note == idx + 2 {
                    self.digit += 1;
                    self.note = 0;
                    (None, Some(GAP_MS))
                } else {
                    let hz = SCALE_HZ[self.note];
                    self.note += 1;
                    (Some(hz), Some(NOTE_MS))
                }
            }
            _ => {
                self.digit += 1;
                (None, Some(GAP_MS))
            }
        }
    }
}
