fn main() {
    if let Err(err) = seatwatch_lib::run() {
        log::error!("seatwatch failed: {err:#}");
        std::process::exit(1);
    }
}
