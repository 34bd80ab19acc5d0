mod entrypoints;

fn main() -> std::process::ExitCode {
    entrypoints::main()
}
