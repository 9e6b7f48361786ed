fn main() {
    std::process::exit(rcc_drv::run());
}
