mod params;
mod request;
