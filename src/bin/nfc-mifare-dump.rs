//! Selects the first ISO14443-A target found and prints its UID/ATQA/SAK.
//! A MIFARE sector dump is out of this crate's scope (no
//! application-layer/filesystem stack); this demo stops at the point a
//! real dump tool would start authenticating sectors.

use clap::Parser;
use pn53x::{Modulation, Target};

#[derive(Parser)]
#[command(name = "nfc-mifare-dump", about = "Select and print the first ISO14443-A target found")]
struct Args {
    /// Connection string, e.g. "pn532_uart:/dev/ttyUSB0". Defaults to
    /// LIBNFC_DEFAULT_DEVICE or the first probed device.
    #[arg(short, long)]
    device: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    pn53x::init();

    let mut handle = match pn53x::open(args.device.as_deref()) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("could not open device: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = pn53x::initiator::initiator_init(&mut handle) {
        eprintln!("initiator_init failed: {e}");
        std::process::exit(1);
    }

    let modulation = Modulation::iso14443a_106();
    match pn53x::initiator::select_passive_target(&mut handle, modulation, &[]) {
        Ok(Target::Iso14443A(card)) => {
            println!("ATQA: {:02X?}", card.atqa);
            println!("SAK:  {:02X}", card.sak);
            println!("UID:  {:02X?}", card.uid.as_bytes());
            if let Some(ats) = &card.ats {
                println!("ATS:  {:02X?}", ats);
            }
        }
        Ok(_) => println!("target found, but not ISO14443-A"),
        Err(e) => {
            eprintln!("select_passive_target failed: {e}");
            std::process::exit(1);
        }
    }

    let _ = handle.close();
}
