use edge_runtime::{handler_fn, run, Context, Error, IntoResponse, Request};

#[tokio::main]
async fn main() -> Result<(), Error> {
    run(handler_fn(hello)).await
}

async fn hello(_: Request, ctx: Context) -> Result<impl IntoResponse, Error> {
    ctx.wait_until(async {
        tracing::info!("runs after the response is sent");
    });
    Ok("👋 world")
}
