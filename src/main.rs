use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    chatstream::cli::main()
}
