fn main() -> anyhow::Result<()> {
    read_from_here_lib::run()
}
