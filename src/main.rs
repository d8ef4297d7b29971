mod agent;
mod app;
mod bus;
mod config;
mod demo_page;
mod drag;
mod geom;
mod input;
mod logging;
mod mood;
mod page;
mod pantry;
mod render;
mod stamina;
mod storage;
mod targeting;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
