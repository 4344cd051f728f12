fn main() {
    if let Err(err) = promptline::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
