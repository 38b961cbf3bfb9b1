#![no_main]

use libfuzzer_sys::fuzz_target;

use livepoll::polls::PollLimits;
use livepoll::session::{ClientCommand, ClientFrame};

// Inbound frames come straight off the socket; parsing and draft validation
// must reject garbage without panicking.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(frame) = ClientFrame::parse(text) else {
        return;
    };
    if let ClientCommand::CreatePoll(draft) = &frame.command {
        let _ = draft.validate(&PollLimits::default());
    }
    let _ = frame.command.name();
});
