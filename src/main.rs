fn main() {
    std::process::exit(handoff::app::startup::startup());
}
