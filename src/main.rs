fn main() {
    if let Err(err) = limnify::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
