fn main() -> anyhow::Result<()> {
    preaching_notes::cli::run()
}
