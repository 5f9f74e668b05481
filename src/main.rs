#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

fn main() {
    if let Err(e) = guardpost::run() {
        eprintln!("guardpost: {}", e);
        std::process::exit(1);
    }
}
