//! FILENAME: app/src/main.rs

fn main() {
    if let Err(error) = app_lib::run() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
