//! The event loop traces every message it handles. Own binary: the test installs the logger.

use dicomscout::bridge::{Cmd, Model, Msg, Program};
use log::{LevelFilter, Log, Metadata, Record};
use std::sync::Mutex;
use std::time::Duration;

struct Capture {
    lines: Mutex<Vec<String>>,
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    lines: Mutex::new(Vec::new()),
};

struct TwoTicks(usize);

impl Model for TwoTicks {
    fn init(&mut self) -> Cmd {
        Cmd::Tick(Duration::from_millis(1))
    }

    fn update(&mut self, msg: Msg) -> Cmd {
        match msg {
            Msg::Tick if self.0 == 0 => {
                self.0 += 1;
                Cmd::Perform(Box::new(|| Msg::Resize {
                    width: 10,
                    height: 5,
                }))
            }
            Msg::Resize { .. } => Cmd::Quit,
            _ => Cmd::None,
        }
    }

    fn view(&self) -> String {
        String::new()
    }
}

#[test]
fn test_program_traces_each_message() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Trace);

    Program::new(TwoTicks(0)).run();

    let lines = CAPTURE.lines.lock().unwrap();
    let msgs: Vec<&String> = lines.iter().filter(|l| l.starts_with("TRACE msg:")).collect();
    assert_eq!(msgs.len(), 2, "{lines:?}");
    assert_eq!(msgs[0], "TRACE msg: Tick");
    assert_eq!(msgs[1], "TRACE msg: Resize { width: 10, height: 5 }");
}
