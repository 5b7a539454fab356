fn main() {
    if let Err(err) = daytally_lib::run() {
        log::error!("daytally failed: {err:#}");
        eprintln!("daytally: {err:#}");
        std::process::exit(1);
    }
}
