fn main() {
    glider_pipeline::cli::run();
}
