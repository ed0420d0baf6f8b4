#![no_main]

use libfuzzer_sys::fuzz_target;
use shutter_app::{AppConfig, Application, InitChain, ShutterApp};
use shutter_types::{Address, GenesisAppState};

// Arbitrary bytes delivered to a running chain are rejected or applied,
// never a panic. Dev mode skips signatures so payloads reach the handlers.
fuzz_target!(|data: &[u8]| {
    let config = AppConfig {
        dev_mode: true,
        ..Default::default()
    };
    let mut app = ShutterApp::new(config);
    let keypers = [Address::new([1; 20]), Address::new([2; 20])];
    let genesis = GenesisAppState::new(&keypers, 1);
    app.init_chain(InitChain {
        chain_id: "shutter-dev".into(),
        app_state: genesis.to_json().expect("genesis json"),
        validators: Vec::new(),
    })
    .expect("init chain");

    for chunk in data.split(|b| *b == 0xFE) {
        let _ = app.check_tx(chunk);
        let _ = app.deliver_tx(chunk);
    }
    app.commit().expect("commit");
});
