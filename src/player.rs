use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::accompaniment::{self, live_note_channel};
use crate::capture::RecordingCapture;
use crate::cli::Options;
use crate::common;
use crate::config::Config;
use crate::dictionary::Dictionary;
use crate::error::StartupError;
use crate::parser::{self, Compiler};
use crate::realtime;
use crate::scheduler::Scheduler;
use crate::transport;

/// Ties the compiler, dictionaries, transport and scheduler together the
/// way `nocrazydots.c::main` drives them in sequence, minus the argument
/// parsing itself (that's `cli::Options`, built by the caller).
pub struct Player {
    config: Config,
}

impl Player {
    pub fn new(config: Config) -> Self {
        Player { config }
    }

    pub fn run(&self, options: &Options) -> Result<(), StartupError> {
        if self.config.realtime_priority {
            realtime::request_priority(common::REALTIME_PRIORITY);
        }

        if options.dump {
            return self.dump(options);
        }

        let data_dir = options
            .data_dir
            .clone()
            .unwrap_or_else(|| self.config.midi_data_dir.clone());

        let mut dictionary = Dictionary::new();
        dictionary.load_voices(&data_dir)?;

        let score_text = read_score(options.score_file.as_deref())?;
        if let Some(kit) = parser::drumkit_binding(&score_text) {
            dictionary.load_drumkit(&data_dir, &kit)?;
        }

        let (mut timeline, _sections) = Compiler::new(&score_text, &dictionary, &self.config)
            .compile()
            .map_err(StartupError::from)?;

        // A `.mid` target implies a virtual port, the way the original
        // overwrites `ncd_midi_port_name` with "virtual" in that branch.
        let port_name = if options.record_midi_file.is_some() {
            Some("virtual".to_string())
        } else {
            options.port_name.clone().or_else(|| self.config.output_port.clone())
        };
        let mut out = transport::open_output(port_name.as_deref())?;
        transport::init_channels(
            &mut out,
            common::DEFAULT_VOLUME,
            common::DEFAULT_PITCH_BEND_SEMITONES,
        );

        let randomness = options
            .randomness_percent
            .unwrap_or(self.config.default_randomness_percent);

        let recording = options.record_midi_file.as_deref().and_then(RecordingCapture::spawn);

        match options.tag {
            Some(tag) => {
                let (sender, mut live) = live_note_channel();
                let _input = transport::open_input(self.config.input_port.as_deref(), move |bytes| {
                    sender.feed(bytes)
                })?;
                accompaniment::play_with_accompaniment(
                    &mut timeline,
                    tag,
                    &mut live,
                    self.config.default_bpm,
                    options.transpose_semitones,
                    randomness,
                    &mut out,
                );
            }
            None => {
                let mut scheduler = Scheduler::new(&self.config, common::DEFAULT_VOLUME, options.transpose_semitones);
                let interrupt = Arc::new(AtomicBool::new(false));
                let flag = Arc::clone(&interrupt);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    log::warn!("cannot install SIGINT handler: {}", e);
                }
                scheduler.play(&mut timeline, &mut out, &interrupt);
            }
        }

        if let Some(capture) = recording {
            capture.stop();
        }

        Ok(())
    }

    /// `-d`/`-dump`: print every incoming raw MIDI byte in hex and block
    /// forever, skipping the usual clock/active-sensing bytes. Mirrors
    /// `ncd_midi_dump`, which runs before any voice loading or parsing.
    fn dump(&self, options: &Options) -> Result<(), StartupError> {
        let port_name = options.port_name.clone().or_else(|| self.config.input_port.clone());
        let _input = transport::open_input(port_name.as_deref(), |bytes| {
            for byte in bytes {
                if *byte != 0xF8 && *byte != 0xFE {
                    print!("{:02x} ", byte);
                }
            }
            std::io::stdout().flush().ok();
        })?;
        loop {
            std::thread::park();
        }
    }
}

fn read_score(path: Option<&Path>) -> Result<String, StartupError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| StartupError::Io {
            context: format!("cannot read score file {:?}", path),
            source,
        }),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).map_err(|source| StartupError::Io {
                context: "cannot read score from standard input".to_string(),
                source,
            })?;
            Ok(text)
        }
    }
}
