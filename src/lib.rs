//! Voice Translator — translate typed or spoken text and read it aloud.
//!
//! The crate is organised as a set of loosely-coupled modules:
//!
//! | Module       | Responsibility                                        |
//! |--------------|-------------------------------------------------------|
//! | `audio`      | Microphone capture, resampling, VAD, audio output     |
//! | `catalog`    | Language names, codes and capability sets             |
//! | `config`     | TOML settings and platform paths                      |
//! | `detect`     | Debounced automatic source-language detection         |
//! | `error`      | User-facing operation errors                          |
//! | `pipeline`   | The orchestrator task and the state it owns           |
//! | `status`     | Progress reports from workers                         |
//! | `stt`        | Speech recognition (Whisper)                          |
//! | `translate`  | Translation providers and the single-flight executor  |
//! | `tts`        | Speech synthesis, temp files and playback             |
//! | `voice`      | Calibrate, listen and recognize one utterance         |

pub mod audio;
pub mod catalog;
pub mod config;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod status;
pub mod stt;
pub mod translate;
pub mod tts;
pub mod voice;
