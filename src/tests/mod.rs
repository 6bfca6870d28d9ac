mod toolkit;
