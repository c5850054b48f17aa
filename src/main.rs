fn main() {
    if let Err(e) = textlens_lib::run() {
        eprintln!("textlens: {e}");
        std::process::exit(1);
    }
}
