mod fetcher;
mod models;
mod parser;

pub use fetcher::{
    parse_feed_url, DocumentFetcher, FeedFetcher, FetchError, FETCH_TIMEOUT, GATOR_USER_AGENT,
};
pub use models::{Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post, User};
pub use parser::{parse_pub_date, parse_rss, RssFeed, RssItem, PUB_DATE_FORMAT};
