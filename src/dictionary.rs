use std::collections::HashMap;
use std::path::Path;

use crate::error::StartupError;

/// Bank-select and program-change numbers for one named voice, read from
/// `voices.txt`. Mirrors `struct voice_data`.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub bank_msb: u8,
    pub bank_lsb: u8,
    pub program: u8,
}

/// Maps lowercased voice names to their bank/program numbers, and
/// lowercased drum effect names to their note numbers. Mirrors the two
/// `hsearch_r` tables built by `ncd_midi_load_voices`/`ncd_midi_load_drumkit`.
#[derive(Debug, Default)]
pub struct Dictionary {
    voices: HashMap<String, Voice>,
    drums: HashMap<String, u8>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary::default()
    }

    /// Loads `voices.txt` from `data_dir`. Each non-comment line is
    /// `name,bank_msb,bank_lsb,program` with a 1-based program number on
    /// disk, stored 0-based. Lines starting with `#` are skipped.
    pub fn load_voices(&mut self, data_dir: &Path) -> Result<(), StartupError> {
        let path = data_dir.join("voices.txt");
        let contents = std::fs::read_to_string(&path).map_err(|source| StartupError::Io {
            context: format!("cannot read voice table {:?}", path),
            source,
        })?;

        for line in contents.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let name = fields.next().ok_or_else(|| malformed(&path, line))?;
            let msb = next_u8(&mut fields, &path, line)?;
            let lsb = next_u8(&mut fields, &path, line)?;
            let program = next_u8(&mut fields, &path, line)?;
            self.voices.insert(
                name.trim().to_lowercase(),
                Voice {
                    bank_msb: msb,
                    bank_lsb: lsb,
                    program: program.wrapping_sub(1),
                },
            );
        }
        Ok(())
    }

    /// Loads `<name>.txt` (a drum kit table) from `data_dir`. Each line is
    /// `effect_name,acronym,note_no`; looked up by acronym.
    pub fn load_drumkit(&mut self, data_dir: &Path, name: &str) -> Result<(), StartupError> {
        let path = data_dir.join(format!("{}.txt", name));
        let contents = std::fs::read_to_string(&path).map_err(|source| StartupError::Io {
            context: format!("cannot read drum kit table {:?}", path),
            source,
        })?;

        for line in contents.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let _effect_name = fields.next();
            let acronym = fields.next().ok_or_else(|| malformed(&path, line))?;
            let note_no = next_u8(&mut fields, &path, line)?;
            self.drums.insert(acronym.trim().to_lowercase(), note_no);
        }
        Ok(())
    }

    pub fn voice(&self, name: &str) -> Option<&Voice> {
        self.voices.get(&name.to_lowercase())
    }

    /// Returns `None` for an unknown acronym, as the original's
    /// `ncd_midi_drum_no` does by returning note number 0.
    pub fn drum_note(&self, acronym: &str) -> Option<u8> {
        self.drums.get(&acronym.to_lowercase()).copied()
    }
}

fn next_u8<'a>(
    fields: &mut std::str::Split<'a, char>,
    path: &Path,
    line: &str,
) -> Result<u8, StartupError> {
    fields
        .next()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| malformed(path, line))
}

fn malformed(path: &Path, line: &str) -> StartupError {
    StartupError::Midi {
        context: format!("malformed line in {:?}", path),
        message: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_voice_table_and_converts_program_to_zero_based() {
        let dir = std::env::temp_dir().join(format!("ncd_test_voices_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut f = std::fs::File::create(dir.join("voices.txt")).unwrap();
        writeln!(f, "# comment").unwrap();
        writeln!(f, "Piano,0,0,1").unwrap();
        drop(f);

        let mut dict = Dictionary::new();
        dict.load_voices(&dir).unwrap();
        let voice = dict.voice("piano").unwrap();
        assert_eq!(voice.program, 0);
        assert_eq!(voice.bank_msb, 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_drum_acronym_returns_none() {
        let dict = Dictionary::new();
        assert_eq!(dict.drum_note("xx"), None);
    }
}
