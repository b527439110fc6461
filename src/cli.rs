use std::path::PathBuf;

use crate::accompaniment::Tag;

/// Parsed shape of one positional argument. Mirrors `nocrazydots.c::main`'s
/// `while (*++argv)` chain: each argument is classified by its textual
/// shape, checked in a fixed order, and the order matters for ambiguous
/// inputs. A one-character score filename would misclassify as a tag here,
/// exactly as it does in the original — that quirk is kept, not fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    PortName(String),
    Tag(Tag),
    Dump,
    RandomnessPercent(u8),
    Transpose(i8),
    DataDir(PathBuf),
    RecordMidiFile(PathBuf),
    ScoreFile(PathBuf),
}

/// Classifies one raw command-line argument, in the same shape-checking
/// order the original scans: port name, single-character tag, dump switch,
/// trailing `%`, leading `+`/`-`, trailing `/`, trailing `.mid`, else a
/// score filename.
pub fn classify(raw: &str) -> Arg {
    if raw.starts_with("hw:") || raw == "virtual" {
        return Arg::PortName(raw.to_string());
    }

    let mut chars = raw.chars();
    if let Some(c) = chars.next() {
        if chars.next().is_none() {
            return Arg::Tag(Tag(c));
        }
    }

    if raw == "-d" || raw == "-dump" {
        return Arg::Dump;
    }

    if let Some(digits) = raw.strip_suffix('%') {
        if let Ok(percent) = digits.parse::<u8>() {
            return Arg::RandomnessPercent(percent);
        }
    }

    if raw.len() > 1 && (raw.starts_with('+') || raw.starts_with('-')) {
        if let Ok(semitones) = raw.parse::<i8>() {
            return Arg::Transpose(semitones);
        }
    }

    if raw.ends_with('/') {
        return Arg::DataDir(PathBuf::from(raw));
    }

    if raw.ends_with(".mid") {
        return Arg::RecordMidiFile(PathBuf::from(raw));
    }

    Arg::ScoreFile(PathBuf::from(raw))
}

/// Every classified positional argument, folded into the options the
/// player needs. Mirrors the accumulation of globals across the original's
/// argument loop (`ncd_port_name`, `ncd_tag`, `ncd_dump`,
/// `ncd_percent_randomness`, `ncd_trans_semitones`, `ncd_data_dir`,
/// `ncd_record_file`, the score filename).
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub port_name: Option<String>,
    pub tag: Option<Tag>,
    pub dump: bool,
    pub randomness_percent: Option<u8>,
    pub transpose_semitones: i8,
    pub data_dir: Option<PathBuf>,
    pub record_midi_file: Option<PathBuf>,
    pub score_file: Option<PathBuf>,
}

impl Options {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Options {
        let mut options = Options::default();
        for raw in args {
            match classify(&raw) {
                Arg::PortName(name) => options.port_name = Some(name),
                Arg::Tag(tag) => options.tag = Some(tag),
                Arg::Dump => options.dump = true,
                Arg::RandomnessPercent(p) => options.randomness_percent = Some(p),
                Arg::Transpose(n) => options.transpose_semitones = n,
                Arg::DataDir(dir) => options.data_dir = Some(dir),
                Arg::RecordMidiFile(path) => options.record_midi_file = Some(path),
                Arg::ScoreFile(path) => options.score_file = Some(path),
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_hw_port_name() {
        assert_eq!(classify("hw:1,0,0"), Arg::PortName("hw:1,0,0".to_string()));
    }

    #[test]
    fn classifies_virtual_port_name() {
        assert_eq!(classify("virtual"), Arg::PortName("virtual".to_string()));
    }

    #[test]
    fn single_character_is_a_tag_even_if_it_looks_like_a_filename() {
        assert_eq!(classify("x"), Arg::Tag(Tag('x')));
    }

    #[test]
    fn classifies_dump_switch() {
        assert_eq!(classify("-dump"), Arg::Dump);
        assert_eq!(classify("-d"), Arg::Dump);
    }

    #[test]
    fn classifies_trailing_percent() {
        assert_eq!(classify("25%"), Arg::RandomnessPercent(25));
    }

    #[test]
    fn classifies_leading_sign_as_transpose() {
        assert_eq!(classify("+3"), Arg::Transpose(3));
        assert_eq!(classify("-12"), Arg::Transpose(-12));
    }

    #[test]
    fn classifies_trailing_slash_as_data_dir() {
        assert_eq!(classify("data/"), Arg::DataDir(PathBuf::from("data/")));
    }

    #[test]
    fn classifies_dot_mid_as_record_file() {
        assert_eq!(classify("out.mid"), Arg::RecordMidiFile(PathBuf::from("out.mid")));
    }

    #[test]
    fn anything_else_is_a_score_file() {
        assert_eq!(classify("song.ncd"), Arg::ScoreFile(PathBuf::from("song.ncd")));
    }

    #[test]
    fn options_accumulate_across_the_whole_argument_list() {
        let options = Options::parse(
            ["hw:1,0,0", "15%", "+2", "data/", "song.ncd"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(options.port_name, Some("hw:1,0,0".to_string()));
        assert_eq!(options.randomness_percent, Some(15));
        assert_eq!(options.transpose_semitones, 2);
        assert_eq!(options.data_dir, Some(PathBuf::from("data/")));
        assert_eq!(options.score_file, Some(PathBuf::from("song.ncd")));
    }
}
