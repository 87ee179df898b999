fn main() {
    if let Err(e) = ironpyc::run_cli() {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
