fn main() {
    if let Err(err) = sheet_geocoder::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
