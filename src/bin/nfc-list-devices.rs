//! Lists connection strings for every PN53x-family device the registered
//! drivers can currently probe. An external collaborator of the core
//! library, consuming only the public device API.

use clap::Parser;

#[derive(Parser)]
#[command(name = "nfc-list-devices", about = "List probeable PN53x connection strings")]
struct Args {
    /// Maximum number of devices to list.
    #[arg(short, long, default_value_t = 16)]
    cap: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    pn53x::init();

    match pn53x::registry::list_devices(args.cap) {
        Ok(devices) if devices.is_empty() => {
            println!("no PN53x devices found");
        }
        Ok(devices) => {
            for (i, connstring) in devices.iter().enumerate() {
                println!("{}: {}", i + 1, connstring);
            }
        }
        Err(e) => {
            eprintln!("error listing devices: {e}");
            std::process::exit(1);
        }
    }
}
