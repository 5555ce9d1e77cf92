mod app;
mod logger;
mod sim;

use app::App;

fn main() -> anyhow::Result<()> {
    logger::init();
    App::new().run()
}
