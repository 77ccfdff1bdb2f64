//! UCI engine binary. Protocol I/O runs over stdin/stdout; diagnostics
//! go through the logger so they never mix into the protocol stream.

mod session;

use session::UciSession;
use tambaqui_engine::Engine;

fn main() {
    env_logger::init();
    let mut session = UciSession::new(Engine::new());
    session.run(std::io::stdin().lock());
}
