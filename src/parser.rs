use std::iter::Peekable;
use std::str::{Chars, FromStr};

use strum_macros::EnumString;

use crate::accompaniment::Tag;
use crate::config::Config;
use crate::dictionary::Dictionary;
use crate::error::ScoreError;
use crate::event::{Event, FixedDuration, DRUM_CHANNEL};
use crate::hairpin::HairpinTracker;
use crate::section::SectionManager;
use crate::timeline::Timeline;

pub const DEFAULT_OCTAVE: i32 = 5;
/// MIDI_NOTE(5, 0): central C, the starting note for relative pitch numbers.
const DEFAULT_START_NOTE: u8 = (DEFAULT_OCTAVE * 12) as u8;

const PPPP: u8 = 8;
const PPP: u8 = 20;
const PP: u8 = 31;
const P: u8 = 42;
const MP: u8 = 53;
const MF: u8 = 64;
const F: u8 = 80;
const FF: u8 = 96;
const FFF: u8 = 112;
const FFFF: u8 = 127;
const DEFAULT_VELOCITY: u8 = MP;
const DEFAULT_DURATION: (i64, i64) = (1, 4);

const BAR: char = '|';
const BEAT: char = ':';
const TIE: char = '^';
const QUOTE: char = '"';
const DOT: char = '.';
const SEP: char = '_';
const PER: char = 'x';
const CRESCENDO: char = '<';
const DIMINUENDO: char = '>';
const HAIRPIN_END: char = '=';

/// Pitch class 0..11 for a movable-do solfège name, including the
/// enharmonic aliases the original accepts.
#[derive(EnumString)]
#[strum(ascii_case_insensitive)]
enum PitchClass {
    #[strum(serialize = "do")]
    Do,
    #[strum(serialize = "di", serialize = "ra")]
    Di,
    #[strum(serialize = "re")]
    Re,
    #[strum(serialize = "ri", serialize = "me")]
    Ri,
    #[strum(serialize = "mi")]
    Mi,
    #[strum(serialize = "fa")]
    Fa,
    #[strum(serialize = "fi", serialize = "se")]
    Fi,
    #[strum(serialize = "so", serialize = "sol")]
    So,
    #[strum(serialize = "si", serialize = "le")]
    Si,
    #[strum(serialize = "la")]
    La,
    #[strum(serialize = "li", serialize = "te")]
    Li,
    #[strum(serialize = "ti")]
    Ti,
}

fn pitch_class(name: &str) -> Option<u8> {
    PitchClass::from_str(name).ok().map(|p| match p {
        PitchClass::Do => 0,
        PitchClass::Di => 1,
        PitchClass::Re => 2,
        PitchClass::Ri => 3,
        PitchClass::Mi => 4,
        PitchClass::Fa => 5,
        PitchClass::Fi => 6,
        PitchClass::So => 7,
        PitchClass::Si => 8,
        PitchClass::La => 9,
        PitchClass::Li => 10,
        PitchClass::Ti => 11,
    })
}

#[derive(EnumString)]
#[strum(ascii_case_insensitive)]
enum DynamicWord {
    Pppp,
    Ppp,
    Pp,
    P,
    Mp,
    Mf,
    F,
    Ff,
    Fff,
    Ffff,
}

fn dynamic_velocity(word: &str) -> Option<u8> {
    DynamicWord::from_str(word).ok().map(|w| match w {
        DynamicWord::Pppp => PPPP,
        DynamicWord::Ppp => PPP,
        DynamicWord::Pp => PP,
        DynamicWord::P => P,
        DynamicWord::Mp => MP,
        DynamicWord::Mf => MF,
        DynamicWord::F => F,
        DynamicWord::Ff => FF,
        DynamicWord::Fff => FFF,
        DynamicWord::Ffff => FFFF,
    })
}

/// A character-at-a-time reader over the score text with one character of
/// look-ahead, tracking line numbers the way the original's `NEXTC` macro
/// does on every `\n`.
struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current: Option<char>,
    line_no: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        let mut lexer = Lexer {
            chars: text.chars().peekable(),
            current: None,
            line_no: 1,
        };
        lexer.advance();
        lexer
    }

    fn advance(&mut self) {
        if self.current == Some('\n') {
            self.line_no += 1;
        }
        self.current = self.chars.next();
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(c) if c == ' ' || c == '\t') {
            self.advance();
        }
    }

    fn skip_sep(&mut self) {
        while self.peek() == Some(SEP) {
            self.advance();
        }
    }

    /// Skips the separator/blanks the way `ADVANCE` does.
    fn step(&mut self) {
        self.advance();
        self.skip_blanks();
    }

    fn read_uint(&mut self) -> Option<u64> {
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            s.push(self.peek().unwrap());
            self.advance();
        }
        if s.is_empty() {
            None
        } else {
            s.parse().ok()
        }
    }

    fn read_number(&mut self) -> Option<f64> {
        let mut s = String::new();
        if self.peek() == Some('-') {
            s.push('-');
            self.advance();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            s.push(self.peek().unwrap());
            self.advance();
        }
        if self.peek() == Some('.') {
            s.push('.');
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                s.push(self.peek().unwrap());
                self.advance();
            }
        }
        if s.is_empty() || s == "-" {
            None
        } else {
            s.parse().ok()
        }
    }

    fn read_alpha(&mut self) -> Option<String> {
        let mut s = String::new();
        while matches!(self.peek(), Some(c) if c.is_alphabetic()) {
            s.push(self.peek().unwrap());
            self.advance();
        }
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

/// A note pending the possibility of being tied to the next token:
/// pushed to the timeline only once we know it won't extend further.
struct PendingNote {
    channel: u8,
    midi_note: u8,
    velocity: u8,
    tag: Option<char>,
    duration: FixedDuration,
}

/// Compiles score text into a [`Timeline`], mirroring `ncd_parse` and its
/// helpers. Holds the parser's running state (current channel, octave,
/// duration, velocity, tie flag) that the original kept in file-level
/// statics.
pub struct Compiler<'a> {
    lexer: Lexer<'a>,
    dictionary: &'a Dictionary,
    config: &'a Config,
    timeline: Timeline,
    sections: SectionManager,
    hairpins: HairpinTracker,
    channel: u8,
    tag: Option<char>,
    octave: i32,
    start_note: u8,
    velocity: u8,
    duration: FixedDuration,
    tie: bool,
    pending: Option<PendingNote>,
    no_notes: bool,
    tempo_changes: Vec<u8>,
    voice_bindings: Vec<(String, u8, u8)>,
}

impl<'a> Compiler<'a> {
    pub fn new(text: &'a str, dictionary: &'a Dictionary, config: &'a Config) -> Self {
        Compiler {
            lexer: Lexer::new(text),
            dictionary,
            config,
            timeline: Timeline::new(),
            sections: SectionManager::new(),
            hairpins: HairpinTracker::new(),
            channel: 0,
            tag: None,
            octave: DEFAULT_OCTAVE,
            start_note: DEFAULT_START_NOTE,
            velocity: DEFAULT_VELOCITY,
            duration: FixedDuration::new(DEFAULT_DURATION.0, DEFAULT_DURATION.1),
            tie: false,
            pending: None,
            no_notes: true,
            tempo_changes: Vec::new(),
            voice_bindings: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ScoreError {
        ScoreError::new(self.lexer.line_no, message)
    }

    /// Consumes the compiler, returning the timeline plus the resolved
    /// section manager (the scheduler needs both to play the score and
    /// honor any remaining section-replay bookkeeping).
    pub fn compile(mut self) -> Result<(Timeline, SectionManager), ScoreError> {
        loop {
            match self.lexer.peek() {
                None => break,
                Some(_) => {}
            }
            self.lexer.skip_blanks();
            if self.lexer.peek() != Some(BAR) {
                self.lexer.skip_blanks();
                if self.lexer.peek() == Some('\n') {
                    self.timeline.new_group();
                } else {
                    while !matches!(self.lexer.peek(), None | Some('\n')) {
                        self.lexer.advance();
                    }
                }
                self.lexer.advance();
                continue;
            }
            self.lexer.step(); // skip BAR and blanks

            match self.lexer.peek() {
                Some(c) if c.is_alphabetic() || c == QUOTE => self.parse_directives()?,
                _ => self.parse_score_row()?,
            }
        }

        if self.no_notes {
            return Err(self.error("empty score, no notes found"));
        }
        Ok((self.timeline, self.sections))
    }

    fn read_channel(&mut self) -> Result<u8, ScoreError> {
        let n = self
            .lexer
            .read_uint()
            .ok_or_else(|| self.error("expected MIDI channel number"))?;
        if n > crate::event::MIDI_CHANNELS as u64 {
            return Err(self.error(format!(
                "invalid channel number {}. There are only {} channels available",
                n,
                crate::event::MIDI_CHANNELS
            )));
        }
        Ok((n - 1) as u8)
    }

    fn parse_directives(&mut self) -> Result<(), ScoreError> {
        loop {
            let quote = self.lexer.peek() == Some(QUOTE);
            if quote {
                self.lexer.advance();
            }
            let mut id = String::new();
            loop {
                match self.lexer.peek() {
                    Some(c) if quote && c == QUOTE => break,
                    Some('\n') | None => return Err(self.error("unterminated directive")),
                    Some(c) if !quote && c.is_ascii_digit() => break,
                    Some(c) => {
                        id.push(c);
                        self.lexer.advance();
                    }
                    None => unreachable!(),
                }
            }
            if quote {
                self.lexer.advance(); // closing quote
            } else {
                while id.ends_with(' ') {
                    id.pop();
                }
            }

            let lower = id.to_lowercase();
            if lower == "bpm" {
                let bpm = self
                    .lexer
                    .read_uint()
                    .ok_or_else(|| self.error("bpm directive needs a number"))?;
                self.tempo_changes.push(bpm as u8);
                self.timeline.push_event(
                    Event::set_tempo(bpm as u8),
                    FixedDuration::ZERO,
                    false,
                );
            } else if matches!(lower.as_str(), "r" | "rec" | "s" | "stop" | "p" | "play") {
                self.lexer.skip_blanks();
                if !matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit()) {
                    return Err(self.error(format!(
                        "section recording directive needs a section number, found `{}'",
                        self.lexer.peek().unwrap_or(' ')
                    )));
                }
                let section = self
                    .lexer
                    .read_uint()
                    .ok_or_else(|| self.error("expected section number"))?
                    .saturating_sub(1) as usize;
                match lower.chars().next().unwrap() {
                    'r' => self.sections.start_recording(section, &self.timeline),
                    's' => self.sections.stop_recording(section, &self.timeline),
                    _ => {
                        self.lexer.skip_blanks();
                        if self.lexer.peek() == Some(PER) {
                            self.lexer.step();
                        }
                        let repeats = if matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit())
                        {
                            self.lexer.read_uint().unwrap_or(1)
                        } else {
                            1
                        };
                        for _ in 0..repeats {
                            self.sections
                                .replay(section, &mut self.timeline)
                                .map_err(|e| self.error(e))?;
                        }
                    }
                }
            } else {
                let channel = self.read_channel()?;
                self.lexer.skip_blanks();
                if !matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit()) {
                    return Err(self.error(format!(
                        "volume must follow channel number for voice {}, found `{}'",
                        id,
                        self.lexer.peek().unwrap_or(' ')
                    )));
                }
                let volume = self
                    .lexer
                    .read_uint()
                    .ok_or_else(|| self.error("expected volume number"))? as u8;
                let voice = self
                    .dictionary
                    .voice(&id)
                    .ok_or_else(|| self.error(format!("unexistant or incorrect voice name {}", id)))?;
                self.voice_bindings.push((id.clone(), channel, volume));
                self.timeline.push_event(
                    Event::controller(channel, 0x07, volume & 0x7F),
                    FixedDuration::ZERO,
                    false,
                );
                self.timeline.push_event(
                    Event::controller(channel, 0x00, voice.bank_msb),
                    FixedDuration::ZERO,
                    false,
                );
                self.timeline.push_event(
                    Event::controller(channel, 0x20, voice.bank_lsb),
                    FixedDuration::ZERO,
                    false,
                );
                self.timeline.push_event(
                    Event::program_change(channel, voice.program),
                    FixedDuration::ZERO,
                    false,
                );
            }

            self.lexer.skip_blanks();
            if self.lexer.peek() == Some(BAR) {
                self.lexer.step();
            }
            if self.lexer.peek() == Some('\n') {
                break;
            }
        }
        self.lexer.advance();
        Ok(())
    }

    fn parse_score_row(&mut self) -> Result<(), ScoreError> {
        if !matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit()) {
            return Err(self.error("expected MIDI channel number"));
        }
        self.channel = self.read_channel()?;
        self.lexer.skip_blanks();

        if self.lexer.peek() == Some(BAR) {
            return Err(self.error("expected one-character tag, found a bar"));
        }
        self.tag = self.lexer.peek();
        self.lexer.step();
        if self.lexer.peek() == Some(BAR) {
            self.lexer.step();
        }
        if self.lexer.peek() == Some('\n') {
            return Err(self.error("empty score line, it needs at least one note or rest"));
        }

        self.timeline.new_line();
        self.pending = None;

        loop {
            self.tie = self.lexer.peek() == Some(TIE);
            if self.tie {
                self.lexer.step();
            }

            if matches!(self.lexer.peek(), Some(CRESCENDO) | Some(DIMINUENDO)) {
                let crescendo = self.lexer.peek() == Some(CRESCENDO);
                self.lexer.advance();
                let percent = self
                    .lexer
                    .read_uint()
                    .ok_or_else(|| self.error("hairpin needs a percentage"))?;
                if percent > 127 {
                    return Err(self.error("hairpin percentage must be lower than 127"));
                }
                self.hairpins.start(
                    &mut self.timeline,
                    self.channel,
                    crescendo,
                    percent as u8,
                    self.duration,
                );
            } else if self.lexer.peek() == Some(HAIRPIN_END) {
                self.lexer.advance();
                self.hairpins
                    .stop(&mut self.timeline, self.channel, self.duration)
                    .map_err(|e| self.error(e))?;
            } else {
                self.parse_note()?;
            }

            self.lexer.skip_blanks();
            if matches!(self.lexer.peek(), Some(BAR) | Some(BEAT)) {
                self.lexer.step();
            }
            if self.lexer.peek() == Some('\n') || self.lexer.peek().is_none() {
                break;
            }
        }
        if let Some(note) = self.pending.take() {
            self.push_note(note);
        }
        self.lexer.advance();
        Ok(())
    }

    fn push_note(&mut self, note: PendingNote) {
        self.timeline.push_event(
            Event::note_on(note.channel, note.midi_note, note.velocity, note.tag, note.duration),
            note.duration,
            false,
        );
        self.timeline
            .push_event(Event::note_off(note.channel, note.midi_note, note.tag), FixedDuration::ZERO, true);
    }

    fn parse_note(&mut self) -> Result<(), ScoreError> {
        let channel = self.channel;
        let mut num_read = false;
        let mut number_separated = false;
        let mut num: f64 = 0.0;

        if matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit())
            || (self.lexer.peek() == Some('-') && channel != DRUM_CHANNEL)
        {
            num_read = true;
            num = self
                .lexer
                .read_number()
                .ok_or_else(|| self.error("expected a number"))?;
            if self.lexer.peek() == Some(SEP) {
                number_separated = true;
                self.lexer.skip_sep();
            }
        }

        let id = if matches!(self.lexer.peek(), Some(c) if c.is_alphabetic()) {
            let s = self.lexer.read_alpha();
            self.lexer.skip_sep();
            s
        } else {
            None
        };

        if !num_read && id.is_none() && self.lexer.peek() != Some('/') {
            return Err(self.error(format!(
                "unexpected char `{}'",
                self.lexer.peek().unwrap_or(' ')
            )));
        }

        let mut is_note = false;
        let mut midi_note: u8 = 0;
        // Tracks whether `id` still names something unconsumed (mirrors
        // `id_read`): cleared once `id` is resolved as a pitch or drum
        // name, so a later bare identifier like "do" isn't mistaken for a
        // dynamics word.
        let mut id_unconsumed = id.is_some();

        if let Some(ref name) = id {
            if channel != DRUM_CHANNEL {
                if let Some(note_no) = pitch_class(name) {
                    is_note = true;
                    if num_read {
                        let octave = num as i32;
                        if num < 0.0 || num > 10.0 || (num - octave as f64).abs() > f64::EPSILON {
                            return Err(self.error(format!(
                                "invalid octave no {}, must be integer from 0 to 10",
                                num
                            )));
                        }
                        self.octave = octave;
                        num_read = false;
                    }
                    if self.octave == 10 && note_no > 7 {
                        return Err(self.error("MIDI note out of range"));
                    }
                    midi_note = (self.octave * 12) as u8 + note_no;
                    self.start_note = midi_note;
                    self.no_notes = false;
                    id_unconsumed = false;
                }
            } else {
                let drum_id = if num_read && num >= 0.0 && num <= 9.0 && (num - num.trunc()).abs() < f64::EPSILON {
                    num_read = false;
                    format!("{}{}", num as i64, name)
                } else {
                    name.clone()
                };
                if let Some(note_no) = self.dictionary.drum_note(&drum_id) {
                    is_note = true;
                    midi_note = note_no;
                    self.no_notes = false;
                    id_unconsumed = false;
                }
            }
        }

        if num_read && channel != DRUM_CHANNEL && (number_separated || self.lexer.peek() != Some('/')) {
            let candidate = self.start_note as i32 + num as i32;
            if candidate < 0 || candidate > 127 {
                return Err(self.error("MIDI note out of range"));
            }
            midi_note = candidate as u8;
            is_note = true;
            num_read = false;
            self.no_notes = false;
            self.lexer.skip_sep();
        }

        if !num_read && matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit()) {
            num_read = true;
            num = self.lexer.read_number().unwrap_or(0.0);
        }

        let mut duration = self.duration;
        if self.lexer.peek() == Some('/') {
            self.lexer.advance();
            let denom = if matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit()) {
                self.lexer.read_uint().unwrap_or(1)
            } else {
                1
            };
            let numerator = if num_read { num as i64 } else { 1 };
            duration = FixedDuration::new(numerator, denom as i64);

            if self.lexer.peek() == Some(DOT) {
                let mut dots_power: i64 = 1;
                loop {
                    dots_power *= 2;
                    self.lexer.advance();
                    if self.lexer.peek() != Some(DOT) {
                        break;
                    }
                }
                // duration *= 2 - 1/dots_power
                duration = duration.mul_fraction(2 * dots_power - 1, dots_power);
            }
            self.lexer.skip_sep();
            self.duration = duration;
        }

        let mut velocity = self.velocity;
        if is_note {
            if matches!(self.lexer.peek(), Some(c) if c.is_ascii_digit()) {
                velocity = self.lexer.read_uint().unwrap_or(velocity as u64) as u8;
            } else {
                let word = if !id_unconsumed && matches!(self.lexer.peek(), Some('m') | Some('f') | Some('p')) {
                    let mut s = String::new();
                    while s.len() < 4 && matches!(self.lexer.peek(), Some('m') | Some('f') | Some('p')) {
                        s.push(self.lexer.peek().unwrap());
                        self.lexer.advance();
                    }
                    id_unconsumed = true;
                    Some(s)
                } else {
                    None
                };
                let candidate = word.or_else(|| if id_unconsumed { id.clone() } else { None });
                if let Some(w) = candidate {
                    match dynamic_velocity(&w) {
                        Some(v) => velocity = v,
                        None => return Err(self.error(format!("unknown velocity nuance {}", w))),
                    }
                }
            }
            self.velocity = velocity;
        }
        self.lexer.skip_sep();

        if is_note {
            if self.tie {
                let pending = self
                    .pending
                    .as_mut()
                    .ok_or_else(|| self.error("tie without a note on the left-hand side"))?;
                if pending.midi_note != midi_note {
                    return Err(self.error("tied notes must be the same note"));
                }
                if pending.velocity != velocity {
                    return Err(self.error("tied notes must be the same velocity"));
                }
                pending.duration = pending.duration + duration;
            } else {
                if let Some(prev) = self.pending.take() {
                    self.push_note(prev);
                }
                self.pending = Some(PendingNote {
                    channel,
                    midi_note,
                    velocity,
                    tag: self.tag,
                    duration,
                });
            }
        } else if let Some(prev) = self.pending.take() {
            self.push_note(prev);
            self.timeline.push_rest(duration);
        } else {
            self.timeline.push_rest(duration);
        }

        Ok(())
    }
}

/// Scans directive lines for a voice bound to the drum channel (1-based
/// channel 10) and returns its name, the drum-kit file to load before
/// compiling. Mirrors `ncd_midi_load_drumkit`'s lazy one-shot load, done
/// as a pre-pass here since the dictionary the compiler borrows is
/// immutable for the whole parse.
pub fn drumkit_binding(text: &str) -> Option<String> {
    for line in text.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix(BAR) else { continue };
        let rest = rest.trim_start();
        let first = rest.chars().next()?;
        if !(first.is_alphabetic() || first == QUOTE) {
            continue;
        }

        let (name, after) = if first == QUOTE {
            let body = &rest[1..];
            let end = body.find(QUOTE)?;
            (&body[..end], &body[end + 1..])
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };

        if name.eq_ignore_ascii_case("bpm") {
            continue;
        }

        let after = after.trim_start();
        let digits_end = after
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        if let Ok(channel) = after[..digits_end].parse::<u8>() {
            if channel == crate::event::DRUM_CHANNEL + 1 {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Returns (tag -> channel bindings), useful for auto-accompaniment to
/// know which recorded tag corresponds to live input.
pub fn tags_in_use(text: &str) -> Vec<Tag> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let rest = trimmed.strip_prefix(BAR)?;
            let mut chars = rest.chars();
            let mut c = chars.next()?;
            while c.is_ascii_digit() {
                c = chars.next()?;
            }
            Some(c).filter(|c| c.is_alphabetic())
        })
        .map(Tag)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use indoc::indoc;

    fn test_dictionary() -> Dictionary {
        Dictionary::new()
    }

    fn test_config() -> Config {
        Config::load(None).unwrap()
    }

    #[test]
    fn compiles_a_single_note_line() {
        let dict = test_dictionary();
        let config = test_config();
        let score = indoc! {"
            |0|A|do/4
        "};
        let (mut tl, _) = Compiler::new(score, &dict, &config).compile().unwrap();
        tl.rewind();
        let on = tl.pop_bucket().unwrap();
        assert_eq!(on.events.borrow().len(), 1);
    }

    #[test]
    fn rejects_empty_score() {
        let dict = test_dictionary();
        let config = test_config();
        let err = Compiler::new("hello\n", &dict, &config).compile().unwrap_err();
        assert!(err.to_string().contains("empty score"));
    }

    #[test]
    fn ties_sum_durations_of_same_note() {
        let dict = test_dictionary();
        let config = test_config();
        let score = indoc! {"
            |0|A|do/4^do/4
        "};
        let (mut tl, _) = Compiler::new(score, &dict, &config).compile().unwrap();
        tl.rewind();
        let on_bucket = tl.pop_bucket().unwrap();
        let events = on_bucket.events.borrow();
        assert_eq!(events[0].duration_beats.as_f64(), 0.5);
    }

    #[test]
    fn rest_does_not_create_a_bucket() {
        let dict = test_dictionary();
        let config = test_config();
        let score = indoc! {"
            |0|A|4/4
        "};
        let (tl, _) = Compiler::new(score, &dict, &config).compile();
        // an all-rest line still has no notes; compile() must reject it
        assert!(tl.is_err());
    }

    #[test]
    fn finds_drum_kit_bound_to_channel_ten() {
        let score = "| standard 10 100\n| bpm 120\n";
        assert_eq!(drumkit_binding(score), Some("standard".to_string()));
    }

    #[test]
    fn bpm_directive_is_not_mistaken_for_a_channel_ten_binding() {
        let score = "| bpm 10\n";
        assert_eq!(drumkit_binding(score), None);
    }

    #[test]
    fn no_binding_found_when_no_drum_channel_used() {
        let score = "| violin 1 100\n";
        assert_eq!(drumkit_binding(score), None);
    }
}
