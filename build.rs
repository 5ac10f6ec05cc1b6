fn main() {
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let mut res = winresource::WindowsResource::new();
    res.set("FileDescription", "Web Page Screensaver");
    res.set("ProductName", "Web Page Screensaver");
    res.set("OriginalFilename", "web-page-screensaver.scr");

    if let Err(e) = res.compile() {
        println!("cargo:warning=Failed to embed Windows resources: {e}");
    }
}
