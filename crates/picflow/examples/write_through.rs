// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Write-through disk caching in front of a simulated network stage.

use std::sync::Arc;
use std::time::Duration;

use picflow::testing::{MockTier, RecordingConsumer};
use picflow::{
    BoxConsumer, CacheChoice, DiskCacheWriteProducer, EncodedImage, ImageFormat, ImageRequest, IntoTierHandle, Producer,
    ProducerContext, Status, TelemetryConfig, UriCacheKeyFactory,
};

/// Delivers a low-quality preview, then the full image, from a background task.
#[derive(Debug)]
struct SimulatedNetwork;

impl Producer<EncodedImage> for SimulatedNetwork {
    fn produce_results(&self, mut consumer: BoxConsumer<EncodedImage>, context: Arc<ProducerContext>) {
        let uri = context.image_request().source_uri().to_string();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            consumer.on_progress_update(0.5);
            consumer.on_new_result(Some(EncodedImage::new(format!("preview:{uri}"), ImageFormat::Jpeg)), Status::NONE);

            tokio::time::sleep(Duration::from_millis(10)).await;
            consumer.on_new_result(Some(EncodedImage::new(format!("full:{uri}"), ImageFormat::Jpeg)), Status::IS_LAST);
        });
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let thumbnails = MockTier::new();
    let main_tier = MockTier::new();

    let stage = DiskCacheWriteProducer::builder(SimulatedNetwork, UriCacheKeyFactory)
        .small_tier(thumbnails.clone().into_handle("thumbnails"))
        .default_tier(main_tier.clone().into_handle("main"))
        .build();

    let telemetry = Arc::new(TelemetryConfig::new().with_logs().build());

    for (uri, choice) in [
        ("https://example.com/photo.jpg", CacheChoice::Default),
        ("https://example.com/thumb.jpg", CacheChoice::Small),
        ("https://example.com/banner.jpg", CacheChoice::dynamic("banners")),
    ] {
        let request = ImageRequest::builder(uri).cache_choice(choice).build();
        let context = ProducerContext::builder(request).listener(telemetry.clone()).build();
        let consumer = RecordingConsumer::new();

        stage.produce_results(consumer.boxed(), context);

        while !consumer.is_terminated() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        println!("{uri}: {} results delivered", consumer.results().len());
    }

    // Let the background writes settle.
    tokio::time::sleep(Duration::from_millis(20)).await;

    println!("main tier entries: {}", main_tier.entry_count());
    println!("thumbnail tier entries: {}", thumbnails.entry_count());
}
