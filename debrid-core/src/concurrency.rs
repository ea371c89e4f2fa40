// Bounded fan-out helpers

use std::future::Future;

use futures::future::join_all;

/// Run `f` over `items` in sequential waves of at most `wave_size`
/// concurrent calls. Results keep the input order.
pub async fn run_in_waves<T, R, F, Fut>(items: Vec<T>, wave_size: usize, mut f: F) -> Vec<R>
where
    F: FnMut(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let wave_size = wave_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter().enumerate().peekable();

    while items.peek().is_some() {
        let wave: Vec<Fut> = items.by_ref().take(wave_size).map(|(i, item)| f(i, item)).collect();
        results.extend(join_all(wave).await);
    }

    results
}

/// Split `items` into chunks of `chunk_size` and run `f` on every chunk
/// concurrently. Results keep the chunk order.
pub async fn run_chunked<T, R, F, Fut>(items: &[T], chunk_size: usize, f: F) -> Vec<R>
where
    T: Clone,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = R>,
{
    join_all(items.chunks(chunk_size.max(1)).map(|chunk| f(chunk.to_vec()))).await
}
