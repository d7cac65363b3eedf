fn main() {
    if let Err(err) = sheet_normalizer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
