fn main() {
    if jobinsight_lib::run().is_err() {
        std::process::exit(1);
    }
}
