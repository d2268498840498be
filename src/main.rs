fn main() -> std::process::ExitCode {
    rubbersense_lib::run()
}
