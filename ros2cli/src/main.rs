fn main() {
    std::process::exit(ros2cli::cli::main());
}
